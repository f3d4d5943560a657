//! Snapshot of one module's diagnostics, indexed by region.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

use super::run_log::RunLog;
use crate::domain::errors::DomainResult;
use crate::domain::models::diagnostic::merge_fixes;
use crate::domain::models::{CandidateFix, DeclLocation, Diagnostic, Region};
use crate::domain::ports::{BuildRequest, Checker};

/// Build `module` as it currently is and snapshot its diagnostics.
pub async fn snapshot<C: Checker + ?Sized>(
    checker: &C,
    module: &str,
    log: &mut RunLog,
) -> DomainResult<DiagnosticStore> {
    let started = Instant::now();
    let result = checker.build(&BuildRequest::module(module)).await;
    log.record_build(started.elapsed());
    Ok(DiagnosticStore::new(result?.diagnostics(module)))
}

/// Difference between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticDelta {
    /// Change in diagnostic count (negative = fewer diagnostics).
    pub effect: i64,
    /// Diagnostics present afterwards that were not present before.
    pub appeared: Vec<Diagnostic>,
}

/// Diagnostics of a module grouped by enclosing region.
///
/// Comparisons are multiset-based, so a checker that reports the same defects
/// in a different order yields an empty delta.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticStore {
    by_region: BTreeMap<Region, Vec<Diagnostic>>,
    total: usize,
}

impl DiagnosticStore {
    pub fn new(diagnostics: &[Diagnostic]) -> Self {
        let mut by_region: BTreeMap<Region, Vec<Diagnostic>> = BTreeMap::new();
        for diagnostic in diagnostics {
            by_region
                .entry(diagnostic.region.clone())
                .or_default()
                .push(diagnostic.clone());
        }
        Self {
            by_region,
            total: diagnostics.len(),
        }
    }

    pub const fn len(&self) -> usize {
        self.total
    }

    pub const fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.by_region.values().flatten()
    }

    pub fn in_region(&self, region: &Region) -> &[Diagnostic] {
        self.by_region.get(region).map_or(&[], Vec::as_slice)
    }

    /// Every resolving fix of every diagnostic, deduplicated by location.
    pub fn fixes(&self) -> BTreeSet<CandidateFix> {
        merge_fixes(self.diagnostics().flat_map(|d| d.resolving_fixes.iter()))
    }

    /// Regions holding a diagnostic that annotating `location` resolves.
    pub fn regions_resolved_by(&self, location: &DeclLocation) -> BTreeSet<Region> {
        self.diagnostics()
            .filter(|d| d.is_resolvable_at(location))
            .map(|d| d.region.clone())
            .collect()
    }

    /// Whole-module comparison against a later snapshot.
    pub fn compare(&self, current: &Self) -> DiagnosticDelta {
        let before: Vec<&Diagnostic> = self.diagnostics().collect();
        let after: Vec<&Diagnostic> = current.diagnostics().collect();
        DiagnosticDelta {
            effect: count_delta(before.len(), after.len()),
            appeared: appeared(&before, &after),
        }
    }

    /// Comparison restricted to `regions` of a later snapshot.
    pub fn compare_regions(&self, current: &Self, regions: &BTreeSet<Region>) -> DiagnosticDelta {
        let mut delta = DiagnosticDelta::default();
        for region in regions {
            let before: Vec<&Diagnostic> = self.in_region(region).iter().collect();
            let after: Vec<&Diagnostic> = current.in_region(region).iter().collect();
            delta.effect += count_delta(before.len(), after.len());
            delta.appeared.extend(appeared(&before, &after));
        }
        delta
    }
}

#[allow(clippy::cast_possible_wrap)]
const fn count_delta(before: usize, after: usize) -> i64 {
    after as i64 - before as i64
}

fn appeared(before: &[&Diagnostic], after: &[&Diagnostic]) -> Vec<Diagnostic> {
    let mut remaining: HashMap<&Diagnostic, usize> = HashMap::new();
    for diagnostic in before {
        *remaining.entry(*diagnostic).or_default() += 1;
    }
    let mut appeared = Vec::new();
    for diagnostic in after {
        match remaining.get_mut(*diagnostic) {
            Some(count) if *count > 0 => *count -= 1,
            _ => appeared.push((*diagnostic).clone()),
        }
    }
    appeared
}
