//! Run statistics and the injection log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::models::{Change, InjectedChange, InjectionPhase, Region};

/// Accumulated over one run and handed back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunLog {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Fix trees measured (including cached measurements).
    pub nodes: u64,
    /// Builds requested from the checker.
    pub builds: u64,
    pub build_time_ms: u64,
    pub total_time_ms: u64,
    /// Every change that was actually written, in order.
    pub injected: Vec<InjectedChange>,
    /// Regions whose resolving fix points outside the known declarations.
    pub unresolved_regions: BTreeSet<Region>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            nodes: 0,
            builds: 0,
            build_time_ms: 0,
            total_time_ms: 0,
            injected: Vec::new(),
            unresolved_regions: BTreeSet::new(),
        }
    }

    pub fn record_build(&mut self, elapsed: Duration) {
        self.builds += 1;
        self.build_time_ms += millis(elapsed);
    }

    pub fn record_nodes(&mut self, count: usize) {
        self.nodes += count as u64;
    }

    pub fn record_unresolved(&mut self, region: Region) {
        self.unresolved_regions.insert(region);
    }

    pub fn record_injection<'a>(
        &mut self,
        phase: InjectionPhase,
        changes: impl IntoIterator<Item = &'a Change>,
    ) {
        self.injected.extend(
            changes
                .into_iter()
                .map(|change| InjectedChange::now(phase, change.clone())),
        );
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.total_time_ms = millis(elapsed);
    }

    pub fn injected_in(&self, phase: InjectionPhase) -> impl Iterator<Item = &Change> {
        self.injected
            .iter()
            .filter(move |entry| entry.phase == phase)
            .map(|entry| &entry.change)
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::DeclLocation;

    #[test]
    fn test_records_builds_and_injections() {
        let mut log = RunLog::new();
        log.record_build(Duration::from_millis(40));
        log.record_build(Duration::from_millis(2));
        assert_eq!(log.builds, 2);
        assert_eq!(log.build_time_ms, 42);

        let change = Change::marker(DeclLocation::field("a.B", "f"), "Nullable");
        log.record_injection(InjectionPhase::Round(1), [&change]);
        log.record_injection(InjectionPhase::FinalSweep, std::iter::empty());

        assert_eq!(log.injected_in(InjectionPhase::Round(1)).count(), 1);
        assert_eq!(log.injected_in(InjectionPhase::FinalSweep).count(), 0);
    }

    #[test]
    fn test_serializes_to_json() {
        let log = RunLog::new();
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["builds"], 0);
        assert!(json["injected"].as_array().unwrap().is_empty());
    }
}
