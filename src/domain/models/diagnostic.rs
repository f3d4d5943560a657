//! Checker diagnostics and the candidate fixes that resolve them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use super::change::Change;
use super::location::{DeclLocation, Region};

/// Diagnostic kinds the engine treats specially.
pub mod kinds {
    /// A non-null field is never initialized.
    pub const FIELD_NO_INIT: &str = "FIELD_NO_INIT";
    /// A constructor or initializer leaves non-null fields uninitialized.
    pub const METHOD_NO_INIT: &str = "METHOD_NO_INIT";
    /// A nullable value is passed where a non-null parameter is expected.
    pub const PASS_NULLABLE: &str = "PASS_NULLABLE";
}

/// Reason attached to parameter fixes forced by a dependent module.
pub const DOWNSTREAM_REASON: &str = "PASSING_NULLABLE_DOWNSTREAM";

/// Where a candidate fix was discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixOrigin {
    #[default]
    Target,
    Downstream,
}

/// One proposed nullable annotation at a declaration.
///
/// Identity is the location alone: two fixes for the same declaration with
/// different reasons are the same fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFix {
    pub location: DeclLocation,
    #[serde(default)]
    pub reasons: BTreeSet<String>,
    #[serde(default)]
    pub origin: FixOrigin,
}

impl CandidateFix {
    pub fn new(location: DeclLocation, reason: impl Into<String>) -> Self {
        Self {
            location,
            reasons: BTreeSet::from([reason.into()]),
            origin: FixOrigin::Target,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: FixOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Fold the reasons of an equal fix into this one.
    pub fn merge_reasons(&mut self, other: &Self) {
        self.reasons.extend(other.reasons.iter().cloned());
    }

    pub fn has_reason(&self, reason: &str) -> bool {
        self.reasons.contains(reason)
    }

    /// The annotation edit that realizes this fix.
    pub fn to_change(&self, nullable_annotation: &str) -> Change {
        Change::marker(self.location.clone(), nullable_annotation)
    }
}

impl PartialEq for CandidateFix {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location
    }
}

impl Eq for CandidateFix {}

impl Hash for CandidateFix {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location.hash(state);
    }
}

impl PartialOrd for CandidateFix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CandidateFix {
    fn cmp(&self, other: &Self) -> Ordering {
        self.location.cmp(&other.location)
    }
}

/// Deduplicate fixes by location, merging the reasons of duplicates.
pub fn merge_fixes<'a>(fixes: impl IntoIterator<Item = &'a CandidateFix>) -> BTreeSet<CandidateFix> {
    let mut merged: BTreeMap<&DeclLocation, CandidateFix> = BTreeMap::new();
    for fix in fixes {
        merged
            .entry(&fix.location)
            .and_modify(|existing| existing.merge_reasons(fix))
            .or_insert_with(|| fix.clone());
    }
    merged.into_values().collect()
}

/// A defect reported by the checker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: String,
    #[serde(default)]
    pub message: String,
    pub region: Region,
    /// Alternative single fixes, any one of which resolves the diagnostic.
    #[serde(default)]
    pub resolving_fixes: BTreeSet<CandidateFix>,
    /// Target member whose nullability this diagnostic traces back to, when
    /// the checker can tell (used for downstream attribution).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<DeclLocation>,
}

impl Diagnostic {
    pub fn new(kind: impl Into<String>, message: impl Into<String>, region: Region) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            region,
            resolving_fixes: BTreeSet::new(),
            origin: None,
        }
    }

    #[must_use]
    pub fn with_fix(mut self, fix: CandidateFix) -> Self {
        self.resolving_fixes.insert(fix);
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: DeclLocation) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// The fix that must be chained, if there is exactly one.
    pub fn single_fix(&self) -> Option<&CandidateFix> {
        if self.resolving_fixes.len() == 1 {
            self.resolving_fixes.iter().next()
        } else {
            None
        }
    }

    pub fn is_unresolvable(&self) -> bool {
        self.resolving_fixes.is_empty()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.resolving_fixes.len() > 1
    }

    /// Resolved when its single fix is among `locations`.
    pub fn is_resolved_by(&self, locations: &BTreeSet<DeclLocation>) -> bool {
        self.single_fix()
            .is_some_and(|fix| locations.contains(&fix.location))
    }

    /// Whether any resolving fix targets `location`.
    pub fn is_resolvable_at(&self, location: &DeclLocation) -> bool {
        self.resolving_fixes.iter().any(|fix| &fix.location == location)
    }
}
