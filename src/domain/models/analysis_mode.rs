//! Decision policies combining local and downstream effect.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::report::{Report, Tag};
use crate::domain::errors::DomainError;

/// Policy used to tag every report of a run.
///
/// | Mode | Approve when |
/// |---|---|
/// | `Local` | `local < 1` |
/// | `LowerBound` | `local + lower < 1` |
/// | `UpperBound` | `local + upper < 1` |
/// | `Strict` | not destructive, `upper == 0` and `local < 1` |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Local,
    #[default]
    LowerBound,
    UpperBound,
    Strict,
}

impl AnalysisMode {
    /// Mode actually applied: bounds are meaningless without downstream analysis.
    pub const fn effective(self, downstream_enabled: bool) -> Self {
        if downstream_enabled {
            self
        } else {
            Self::Local
        }
    }

    /// Net effect the policy compares against the approval threshold.
    pub const fn overall_effect(self, report: &Report) -> i64 {
        match self {
            Self::Local => report.local_effect,
            Self::LowerBound => report.local_effect + report.lower_bound,
            Self::UpperBound | Self::Strict => report.local_effect + report.upper_bound,
        }
    }

    pub fn tag(self, report: &Report) -> Tag {
        let approve = match self {
            Self::Local | Self::LowerBound | Self::UpperBound => self.overall_effect(report) < 1,
            Self::Strict => {
                if report.destructive {
                    false
                } else if report.upper_bound != 0 {
                    tracing::debug!(
                        root = %report.root.location,
                        upper_bound = report.upper_bound,
                        "strict mode rejects a tree with non-zero upper bound"
                    );
                    false
                } else {
                    report.local_effect < 1
                }
            }
        };
        if approve {
            Tag::Approve
        } else {
            Tag::Reject
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::LowerBound => write!(f, "lower_bound"),
            Self::UpperBound => write!(f, "upper_bound"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for AnalysisMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "default" | "lower_bound" => Ok(Self::LowerBound),
            "upper_bound" => Ok(Self::UpperBound),
            "strict" => Ok(Self::Strict),
            other => Err(DomainError::InvalidAnalysisMode(other.to_string())),
        }
    }
}
