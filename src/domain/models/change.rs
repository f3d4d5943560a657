//! Annotation edits handed to the injector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::location::DeclLocation;

/// A single annotation to add to (or remove from) a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Change {
    pub location: DeclLocation,
    /// Fully qualified annotation name.
    pub annotation: String,
    /// Single string argument, e.g. a suppression key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

impl Change {
    pub fn marker(location: DeclLocation, annotation: impl Into<String>) -> Self {
        Self {
            location,
            annotation: annotation.into(),
            argument: None,
        }
    }

    pub fn with_argument(
        location: DeclLocation,
        annotation: impl Into<String>,
        argument: impl Into<String>,
    ) -> Self {
        Self {
            location,
            annotation: annotation.into(),
            argument: Some(argument.into()),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(arg) => write!(f, "@{}(\"{arg}\") on {}", self.annotation, self.location),
            None => write!(f, "@{} on {}", self.annotation, self.location),
        }
    }
}

/// Which stage of a run produced an injected change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", content = "round", rename_all = "snake_case")]
pub enum InjectionPhase {
    Preprocess,
    Round(usize),
    FinalSweep,
    ForceResolve,
}

impl fmt::Display for InjectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preprocess => write!(f, "preprocess"),
            Self::Round(n) => write!(f, "round {n}"),
            Self::FinalSweep => write!(f, "final sweep"),
            Self::ForceResolve => write!(f, "force resolve"),
        }
    }
}

/// An entry in the machine-readable injection log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedChange {
    pub phase: InjectionPhase,
    pub change: Change,
    pub injected_at: DateTime<Utc>,
}

impl InjectedChange {
    pub fn now(phase: InjectionPhase, change: Change) -> Self {
        Self {
            phase,
            change,
            injected_at: Utc::now(),
        }
    }
}
