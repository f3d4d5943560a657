//! Fix tree exploration.
//!
//! Each root candidate grows into a tree level by level: the tree is applied,
//! the target rebuilt, and every newly appeared diagnostic with exactly one
//! resolving fix pulls that fix into the next level. The effect of a tree is
//! always measured with the whole tree applied against the round's baseline.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use super::conflict_graph::{ConflictGraph, ConflictNode};
use super::diagnostic_store::{DiagnosticDelta, DiagnosticStore};
use super::downstream_impact::DownstreamImpactAnalyzer;
use super::run_log::RunLog;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CandidateFix, Change, Config, DeclLocation, ExplorationStrategy, FixOrigin, Region, Report,
    DOWNSTREAM_REASON,
};
use crate::domain::ports::{BuildRequest, Checker, DeclarationRegistry, Injector};

/// Explorer knobs taken from [`Config`].
#[derive(Debug, Clone)]
pub struct ExplorerSettings {
    pub target_module: String,
    pub depth: usize,
    pub bailout: bool,
    pub strategy: ExplorationStrategy,
    pub parallel: bool,
    pub max_group_size: usize,
    pub nullable_annotation: String,
}

impl ExplorerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_module: config.target_module.clone(),
            depth: config.inference.depth,
            bailout: config.inference.bailout,
            strategy: config.inference.strategy,
            parallel: config.execution.parallel_processing,
            max_group_size: config.execution.max_group_size,
            nullable_annotation: config.annotations.nullable.clone(),
        }
    }
}

/// Grows fix trees and measures their effect on the target.
pub struct Explorer<C, I, R> {
    checker: Arc<C>,
    injector: Arc<I>,
    registry: Arc<R>,
    settings: ExplorerSettings,
    memo: HashMap<BTreeSet<DeclLocation>, DiagnosticDelta>,
}

impl<C, I, R> Explorer<C, I, R>
where
    C: Checker,
    I: Injector,
    R: DeclarationRegistry,
{
    pub fn new(checker: Arc<C>, injector: Arc<I>, registry: Arc<R>, settings: ExplorerSettings) -> Self {
        Self {
            checker,
            injector,
            registry,
            settings,
            memo: HashMap::new(),
        }
    }

    /// Drop memoized measurements. Required whenever the target changes.
    pub fn invalidate(&mut self) {
        self.memo.clear();
    }

    /// Explore every candidate to a finished report.
    ///
    /// A build failure aborts the whole batch; no partial report is returned.
    #[instrument(skip_all, fields(candidates = candidates.len(), depth = self.settings.depth))]
    pub async fn evaluate(
        &mut self,
        candidates: &BTreeSet<CandidateFix>,
        baseline: &DiagnosticStore,
        downstream: &DownstreamImpactAnalyzer,
        log: &mut RunLog,
    ) -> DomainResult<Vec<Report>> {
        let mut reports: Vec<Report> = candidates.iter().cloned().map(Report::new).collect();

        if self.settings.strategy == ExplorationStrategy::Exhaustive {
            log.record_nodes(reports.len());
            for report in &mut reports {
                report.finished = true;
            }
            return Ok(reports);
        }

        let mut worklist: Vec<usize> = (0..reports.len()).collect();
        for depth in 1..=self.settings.depth {
            if worklist.is_empty() {
                break;
            }
            if depth > 1 {
                for &index in &worklist {
                    let tree = reports[index].next_tree();
                    reports[index] = reports[index].clone().with_tree(tree);
                }
            }

            let trees: Vec<&BTreeSet<CandidateFix>> =
                worklist.iter().map(|&index| &reports[index].tree).collect();
            let measurements = self.measure(&trees, baseline, log).await?;
            log.record_nodes(worklist.len());

            let mut next = Vec::new();
            for (&index, measurement) in worklist.iter().zip(measurements) {
                let report = self.expand(reports[index].clone(), measurement, depth, downstream, log);
                if report.in_progress() {
                    next.push(index);
                }
                reports[index] = report;
            }
            debug!(depth, remaining = next.len(), "exploration level done");
            worklist = next;
        }

        for index in worklist {
            reports[index].finished = true;
        }
        Ok(reports)
    }

    /// Fold a measurement into the next version of a report.
    fn expand(
        &self,
        report: Report,
        measurement: DiagnosticDelta,
        depth: usize,
        downstream: &DownstreamImpactAnalyzer,
        log: &mut RunLog,
    ) -> Report {
        let tree_locations = report.tree_locations();

        let mut triggered_fixes = BTreeSet::new();
        for diagnostic in &measurement.appeared {
            let Some(fix) = diagnostic.single_fix() else {
                continue;
            };
            if tree_locations.contains(&fix.location) {
                continue;
            }
            if self.registry.contains(&fix.location) {
                triggered_fixes.insert(fix.clone());
            } else {
                debug!(region = %diagnostic.region, fix = %fix.location, "fix outside target, left unresolved");
                log.record_unresolved(diagnostic.region.clone());
            }
        }

        let triggered_downstream_fixes = downstream
            .impacted_parameters(&tree_locations)
            .into_iter()
            .filter(|location| self.registry.contains(location))
            .map(|location| CandidateFix::new(location, DOWNSTREAM_REASON).with_origin(FixOrigin::Downstream))
            .collect();

        let mut report = Report {
            local_effect: measurement.effect,
            triggered_diagnostics: measurement.appeared.into_iter().collect(),
            triggered_fixes,
            triggered_downstream_fixes,
            depth,
            ..report
        };

        // Downstream-forced parameters must join the tree before it may stop.
        if self.settings.bailout && report.local_effect >= 0 && !report.has_outstanding_obligations() {
            report.finished = true;
            report.bailed_out = true;
        } else if report.next_tree().len() == report.tree.len() {
            report.finished = true;
        }
        report
    }

    async fn measure(
        &mut self,
        trees: &[&BTreeSet<CandidateFix>],
        baseline: &DiagnosticStore,
        log: &mut RunLog,
    ) -> DomainResult<Vec<DiagnosticDelta>> {
        let cached = self.settings.strategy == ExplorationStrategy::Cached;
        let mut results: Vec<Option<DiagnosticDelta>> = vec![None; trees.len()];
        let mut pending = Vec::new();
        let mut duplicates = Vec::new();
        let mut first_seen: HashMap<BTreeSet<DeclLocation>, usize> = HashMap::new();

        for (index, tree) in trees.iter().enumerate() {
            if cached {
                let key = locations(tree);
                if let Some(delta) = self.memo.get(&key) {
                    results[index] = Some(delta.clone());
                    continue;
                }
                if let Some(&first) = first_seen.get(&key) {
                    duplicates.push((index, first));
                    continue;
                }
                first_seen.insert(key, index);
            }
            pending.push(index);
        }

        if self.settings.parallel && pending.len() > 1 {
            self.measure_batched(&pending, trees, baseline, &mut results, log)
                .await?;
        } else {
            for &index in &pending {
                results[index] = Some(self.measure_one(trees[index], baseline, log).await?);
            }
        }

        for (index, first) in duplicates {
            results[index] = results[first].clone();
        }

        if cached {
            for &index in &pending {
                if let Some(delta) = &results[index] {
                    self.memo.insert(locations(trees[index]), delta.clone());
                }
            }
        }

        Ok(results.into_iter().map(Option::unwrap_or_default).collect())
    }

    async fn measure_one(
        &self,
        tree: &BTreeSet<CandidateFix>,
        baseline: &DiagnosticStore,
        log: &mut RunLog,
    ) -> DomainResult<DiagnosticDelta> {
        let changes = self.changes_for(tree.iter());
        let current = self.build_with(&changes, log).await?;
        Ok(baseline.compare(&current))
    }

    /// Apply non-conflicting trees together and measure each over its regions.
    async fn measure_batched(
        &self,
        pending: &[usize],
        trees: &[&BTreeSet<CandidateFix>],
        baseline: &DiagnosticStore,
        results: &mut [Option<DiagnosticDelta>],
        log: &mut RunLog,
    ) -> DomainResult<()> {
        let graph = ConflictGraph::new(
            pending
                .iter()
                .map(|&index| ConflictNode {
                    locations: locations(trees[index]),
                    regions: self.regions_for(trees[index], baseline),
                })
                .collect(),
        );

        for group in graph.groups(self.settings.max_group_size) {
            if let [single] = group.as_slice() {
                let index = pending[*single];
                results[index] = Some(self.measure_one(trees[index], baseline, log).await?);
                continue;
            }

            let members: Vec<&ConflictNode> = group.iter().filter_map(|&n| graph.node(n)).collect();
            let group_locations: BTreeSet<DeclLocation> = members
                .iter()
                .flat_map(|node| node.locations.iter().cloned())
                .collect();
            let changes = self.changes_for(group.iter().flat_map(|&n| trees[pending[n]].iter()));
            let current = self.build_with(&changes, log).await?;
            debug!(group_size = group.len(), "measured group in one build");

            for (&n, node) in group.iter().zip(members) {
                let mut delta = baseline.compare_regions(&current, &node.regions);
                delta.effect += self.inheritance_correction(&node.locations, &group_locations);
                results[pending[n]] = Some(delta);
            }
        }
        Ok(())
    }

    /// Overrides whose super declaration was annotated by a neighbour in the
    /// same build: the violation they would raise alone was hidden.
    fn inheritance_correction(
        &self,
        own: &BTreeSet<DeclLocation>,
        group: &BTreeSet<DeclLocation>,
    ) -> i64 {
        let hidden = own
            .iter()
            .filter(|location| location.is_method())
            .filter_map(|location| self.registry.super_member(location))
            .filter(|sup| group.contains(sup) && !own.contains(sup))
            .count();
        i64::try_from(hidden).unwrap_or(i64::MAX)
    }

    /// Regions whose diagnostics the tree can change.
    fn regions_for(&self, tree: &BTreeSet<CandidateFix>, baseline: &DiagnosticStore) -> BTreeSet<Region> {
        let mut regions = BTreeSet::new();
        for fix in tree {
            regions.extend(baseline.regions_resolved_by(&fix.location));
            regions.extend(self.registry.impacted_regions(&fix.location));
            regions.insert(fix.location.region());
            if fix.location.is_parameter() && fix.location.is_constructor() {
                regions.insert(Region::initializer(fix.location.class()));
            }
        }
        regions
    }

    fn changes_for<'a>(&self, fixes: impl Iterator<Item = &'a CandidateFix>) -> Vec<Change> {
        fixes
            .map(|fix| fix.to_change(&self.settings.nullable_annotation))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Build the target with `changes` applied, then take them out again.
    async fn build_with(&self, changes: &[Change], log: &mut RunLog) -> DomainResult<DiagnosticStore> {
        let outcome = self.injector.apply(changes).await?;
        if !outcome.succeeded() {
            warn!(failed = outcome.failed.len(), "some annotations could not be applied for measurement");
        }

        let started = Instant::now();
        let build = self
            .checker
            .build(&BuildRequest::module(self.settings.target_module.clone()))
            .await;
        log.record_build(started.elapsed());

        let restored = self.injector.remove(changes).await;
        let build = build?;
        restored?;

        Ok(DiagnosticStore::new(build.diagnostics(&self.settings.target_module)))
    }
}

fn locations(tree: &BTreeSet<CandidateFix>) -> BTreeSet<DeclLocation> {
    tree.iter().map(|fix| fix.location.clone()).collect()
}
