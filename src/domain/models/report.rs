//! Measured outcome of one root candidate fix.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::diagnostic::{CandidateFix, Diagnostic, FixOrigin};
use super::location::DeclLocation;

/// Decision attached to a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tag {
    Approve,
    #[default]
    Reject,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => write!(f, "APPROVE"),
            Self::Reject => write!(f, "REJECT"),
        }
    }
}

/// Outcome of exploring one root fix.
///
/// Reports are values: every exploration step or decision produces a new
/// report through the `with_*` builders instead of patching one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub root: CandidateFix,
    /// Root plus every fix chained in so far. Always contains `root`.
    pub tree: BTreeSet<CandidateFix>,
    /// Signed change in target diagnostics with the whole tree applied.
    pub local_effect: i64,
    /// Diagnostics that newly appeared with the tree applied.
    pub triggered_diagnostics: BTreeSet<Diagnostic>,
    /// Single-fix resolutions of `triggered_diagnostics` not yet in the tree.
    pub triggered_fixes: BTreeSet<CandidateFix>,
    /// Target parameters a dependent would force nullable through the tree.
    pub triggered_downstream_fixes: BTreeSet<CandidateFix>,
    pub lower_bound: i64,
    pub upper_bound: i64,
    /// Some fix in the tree triggers a dependent diagnostic no target fix resolves.
    pub destructive: bool,
    pub tag: Tag,
    /// Tree growth has stopped.
    pub finished: bool,
    /// Growth stopped because bailout fired.
    pub bailed_out: bool,
    /// Exploration depth reached.
    pub depth: usize,
}

impl Report {
    pub fn new(root: CandidateFix) -> Self {
        Self {
            tree: BTreeSet::from([root.clone()]),
            root,
            local_effect: 0,
            triggered_diagnostics: BTreeSet::new(),
            triggered_fixes: BTreeSet::new(),
            triggered_downstream_fixes: BTreeSet::new(),
            lower_bound: 0,
            upper_bound: 0,
            destructive: false,
            tag: Tag::Reject,
            finished: false,
            bailed_out: false,
            depth: 0,
        }
    }

    pub fn tree_locations(&self) -> BTreeSet<DeclLocation> {
        self.tree.iter().map(|fix| fix.location.clone()).collect()
    }

    /// Downstream-forced fixes that originate in the target and are missing
    /// from the tree.
    pub fn has_outstanding_obligations(&self) -> bool {
        self.triggered_downstream_fixes
            .iter()
            .any(|fix| fix.origin == FixOrigin::Downstream && !self.tree.contains(fix))
    }

    pub const fn in_progress(&self) -> bool {
        !self.finished
    }

    /// Growth stopped and nothing the tree forces is left outside it.
    pub fn is_converged(&self) -> bool {
        self.finished && !self.has_outstanding_obligations()
    }

    pub const fn approved(&self) -> bool {
        matches!(self.tag, Tag::Approve)
    }

    /// Triggered diagnostics no annotation can resolve.
    pub fn unresolvable_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.triggered_diagnostics.iter().filter(|d| d.is_unresolvable())
    }

    /// Triggered diagnostics with several alternative fixes.
    pub fn ambiguous_diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.triggered_diagnostics.iter().filter(|d| d.is_ambiguous())
    }

    /// The tree for the next exploration level.
    pub fn next_tree(&self) -> BTreeSet<CandidateFix> {
        let mut tree = self.tree.clone();
        for fix in self
            .triggered_fixes
            .iter()
            .chain(self.triggered_downstream_fixes.iter())
        {
            if !tree.contains(fix) {
                tree.insert(fix.clone());
            }
        }
        tree
    }

    /// Fixes to inject when this report is approved.
    pub fn selected_fixes(&self, chain: bool) -> Vec<CandidateFix> {
        if chain {
            self.tree.iter().cloned().collect()
        } else {
            vec![self.root.clone()]
        }
    }

    #[must_use]
    pub fn with_tree(mut self, tree: BTreeSet<CandidateFix>) -> Self {
        self.tree = tree;
        self.tree.insert(self.root.clone());
        self
    }

    #[must_use]
    pub fn with_bounds(mut self, lower: i64, upper: i64, destructive: bool) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self.destructive = destructive;
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tag = tag;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(field: &str) -> CandidateFix {
        CandidateFix::new(DeclLocation::field("a.B", field), "TEST")
    }

    #[test]
    fn test_new_report_contains_root() {
        let report = Report::new(fix("f"));
        assert!(report.tree.contains(&fix("f")));
        assert_eq!(report.tag, Tag::Reject);
        assert!(report.in_progress());
    }

    #[test]
    fn test_next_tree_merges_triggered_fixes() {
        let mut report = Report::new(fix("f"));
        report.triggered_fixes.insert(fix("g"));
        report
            .triggered_downstream_fixes
            .insert(fix("h").with_origin(FixOrigin::Downstream));

        let tree = report.next_tree();
        assert_eq!(tree.len(), 3);
        assert!(tree.contains(&fix("h")));
    }

    #[test]
    fn test_outstanding_obligations() {
        let mut report = Report::new(fix("f"));
        report.finished = true;
        report
            .triggered_downstream_fixes
            .insert(fix("p").with_origin(FixOrigin::Downstream));
        assert!(report.has_outstanding_obligations());
        assert!(!report.is_converged());

        let report = report.clone().with_tree(report.next_tree());
        assert!(!report.has_outstanding_obligations());
        assert!(report.is_converged());
    }

    #[test]
    fn test_selected_fixes_by_chain_mode() {
        let report = Report::new(fix("f")).with_tree(BTreeSet::from([fix("g")]));
        assert_eq!(report.selected_fixes(false), vec![fix("f")]);
        assert_eq!(report.selected_fixes(true).len(), 2);
    }
}
