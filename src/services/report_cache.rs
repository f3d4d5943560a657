//! Reports keyed by root fix, and the round-level fixed-point signal.

use std::collections::BTreeMap;

use crate::domain::models::{CandidateFix, Report};

/// Memo of every report produced in a run.
///
/// `is_updated` turns false once a round adds no new root, which is the
/// orchestration loop's stop condition.
#[derive(Debug)]
pub struct ReportCache {
    store: BTreeMap<CandidateFix, Report>,
    enabled: bool,
    updated: bool,
}

impl ReportCache {
    pub const fn new(enabled: bool) -> Self {
        Self {
            store: BTreeMap::new(),
            enabled,
            updated: true,
        }
    }

    /// Whether `fix` was already evaluated. Always false while disabled.
    pub fn processed(&self, fix: &CandidateFix) -> bool {
        self.enabled && self.store.contains_key(fix)
    }

    /// Store this round's reports, replacing older reports for the same roots.
    pub fn update(&mut self, reports: impl IntoIterator<Item = Report>) {
        let size_before = self.store.len();
        for report in reports {
            self.store.insert(report.root.clone(), report);
        }
        self.updated = self.store.len() != size_before;
    }

    pub const fn is_updated(&self) -> bool {
        self.updated
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn into_reports(self) -> Vec<Report> {
        self.store.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DeclLocation;

    fn report(field: &str) -> Report {
        Report::new(CandidateFix::new(DeclLocation::field("a.B", field), "X"))
    }

    #[test]
    fn test_initially_updated() {
        let cache = ReportCache::new(true);
        assert!(cache.is_updated());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_update_signals_progress_only_for_new_roots() {
        let mut cache = ReportCache::new(true);
        cache.update(vec![report("f"), report("g")]);
        assert!(cache.is_updated());

        let mut changed = report("f");
        changed.local_effect = -3;
        cache.update(vec![changed]);
        assert!(!cache.is_updated());

        cache.update(Vec::new());
        assert!(!cache.is_updated());
        let reports = cache.into_reports();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].local_effect, -3);
    }

    #[test]
    fn test_disabled_cache_reports_nothing_processed() {
        let mut cache = ReportCache::new(true);
        cache.update(vec![report("f")]);
        assert!(cache.processed(&report("f").root));

        cache.disable();
        assert!(!cache.processed(&report("f").root));
        assert_eq!(cache.len(), 1);

        cache.enable();
        assert!(cache.processed(&report("f").root));
    }
}
