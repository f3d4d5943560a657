//! Precomputed effect of the target's public surface on dependent modules.
//!
//! Every dependent is built twice, once as is and once with every public
//! member of the target assumed nullable. Diagnostics that appear in the
//! second build are attributed to the member they trace back to. Bound queries
//! afterwards are pure lookups; dependents are never rebuilt.

use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::diagnostic_store::DiagnosticStore;
use super::run_log::RunLog;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DeclLocation, Diagnostic, Report};
use crate::domain::ports::{BuildRequest, BuildResult, Checker, DeclarationRegistry};

/// A dependent-module diagnostic caused by a target member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownstreamDiagnostic {
    pub module: String,
    pub diagnostic: Diagnostic,
    /// Every resolving fix is declared in the target (and there is one).
    pub fixable_on_target: bool,
}

impl DownstreamDiagnostic {
    /// Target parameter this diagnostic forces nullable, if any.
    pub fn forced_parameter(&self) -> Option<&DeclLocation> {
        if !self.fixable_on_target {
            return None;
        }
        self.diagnostic
            .single_fix()
            .map(|fix| &fix.location)
            .filter(|location| location.is_parameter())
    }
}

/// Downstream consequences of making one target member nullable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberImpact {
    pub member: DeclLocation,
    pub triggered: Vec<DownstreamDiagnostic>,
    /// The member has been injected; its impact is already paid.
    pub applied: bool,
}

impl MemberImpact {
    pub const fn new(member: DeclLocation) -> Self {
        Self {
            member,
            triggered: Vec::new(),
            applied: false,
        }
    }

    #[must_use]
    pub fn with_diagnostic(mut self, module: &str, diagnostic: Diagnostic, fixable_on_target: bool) -> Self {
        self.triggered.push(DownstreamDiagnostic {
            module: module.to_string(),
            diagnostic,
            fixable_on_target,
        });
        self
    }

    /// Effect minus diagnostics a fix already in `tree` resolves.
    pub fn effect_given(&self, tree: &BTreeSet<DeclLocation>) -> i64 {
        if self.applied {
            return 0;
        }
        count(
            self.triggered
                .iter()
                .filter(|t| !t.diagnostic.is_resolved_by(tree))
                .count(),
        )
    }

    pub fn impacted_parameters(&self) -> BTreeSet<DeclLocation> {
        if self.applied {
            return BTreeSet::new();
        }
        self.triggered
            .iter()
            .filter_map(DownstreamDiagnostic::forced_parameter)
            .cloned()
            .collect()
    }

    /// Triggers a dependent diagnostic no target annotation can resolve.
    pub fn is_destructive(&self) -> bool {
        !self.applied && self.triggered.iter().any(|t| !t.fixable_on_target)
    }
}

/// Bound oracle over the precomputed member impacts.
#[derive(Debug, Clone, Default)]
pub struct DownstreamImpactAnalyzer {
    impacts: BTreeMap<DeclLocation, MemberImpact>,
    enabled: bool,
}

impl DownstreamImpactAnalyzer {
    /// Analyzer for runs without downstream analysis: every bound is zero.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_impacts(impacts: impl IntoIterator<Item = MemberImpact>) -> Self {
        Self {
            impacts: impacts
                .into_iter()
                .map(|impact| (impact.member.clone(), impact))
                .collect(),
            enabled: true,
        }
    }

    /// Build every dependent with and without the hypothetical annotations
    /// and attribute the difference to target members.
    #[instrument(skip_all, fields(modules = modules.len()))]
    pub async fn analyze<C, R>(
        checker: Arc<C>,
        registry: &R,
        modules: &[String],
        max_workers: usize,
        log: &mut RunLog,
    ) -> DomainResult<Self>
    where
        C: Checker + 'static,
        R: DeclarationRegistry + ?Sized,
    {
        let members: BTreeSet<DeclLocation> = registry.public_members().into_iter().collect();
        if modules.is_empty() || members.is_empty() {
            info!("no downstream surface to analyze");
            return Ok(Self::from_impacts(Vec::new()));
        }

        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut handles = vec![];

        for module in modules {
            for assumed in [BTreeSet::new(), members.clone()] {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| DomainError::build_failed(modules, "worker pool closed"))?;
                let checker = checker.clone();
                let request = BuildRequest::module(module.clone()).assuming(assumed);

                let handle = tokio::spawn(async move {
                    let _permit = permit;
                    let started = Instant::now();
                    let result = checker.build(&request).await;
                    (request, result, started.elapsed())
                });
                handles.push(handle);
            }
        }

        let mut plain: BTreeMap<String, DiagnosticStore> = BTreeMap::new();
        let mut hypothetical: BTreeMap<String, DiagnosticStore> = BTreeMap::new();
        for joined in join_all(handles).await {
            let (request, result, elapsed): (BuildRequest, DomainResult<BuildResult>, Duration) =
                joined.map_err(|e| DomainError::build_failed(modules, e.to_string()))?;
            log.record_build(elapsed);
            let result = result?;
            for module in &request.modules {
                let store = DiagnosticStore::new(result.diagnostics(module));
                if request.assume_nullable.is_empty() {
                    plain.insert(module.clone(), store);
                } else {
                    hypothetical.insert(module.clone(), store);
                }
            }
        }

        let mut impacts: BTreeMap<DeclLocation, MemberImpact> = BTreeMap::new();
        let mut unattributed = 0usize;
        for module in modules {
            let (Some(before), Some(after)) = (plain.get(module), hypothetical.get(module)) else {
                continue;
            };
            for diagnostic in before.compare(after).appeared {
                let Some(origin) = diagnostic.origin.clone().filter(|o| members.contains(o)) else {
                    unattributed += 1;
                    continue;
                };
                let fixable = is_fixable_on_target(registry, &diagnostic);
                let impact = impacts
                    .remove(&origin)
                    .unwrap_or_else(|| MemberImpact::new(origin.clone()))
                    .with_diagnostic(module, diagnostic, fixable);
                impacts.insert(origin, impact);
            }
        }

        if unattributed > 0 {
            warn!(unattributed, "downstream diagnostics without a target origin were ignored");
        }
        info!(
            members = members.len(),
            impacted = impacts.len(),
            "downstream impact precomputed"
        );

        Ok(Self {
            impacts,
            enabled: true,
        })
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn tree_impacts<'a>(
        &'a self,
        tree: &'a BTreeSet<DeclLocation>,
    ) -> impl Iterator<Item = &'a MemberImpact> + 'a {
        tree.iter().filter_map(|location| self.impacts.get(location))
    }

    /// Largest single-member effect in the tree.
    pub fn lower_bound(&self, tree: &BTreeSet<DeclLocation>) -> i64 {
        self.tree_impacts(tree)
            .map(|impact| impact.effect_given(tree))
            .max()
            .unwrap_or(0)
    }

    /// Sum of member effects in the tree.
    pub fn upper_bound(&self, tree: &BTreeSet<DeclLocation>) -> i64 {
        self.tree_impacts(tree)
            .map(|impact| impact.effect_given(tree))
            .sum()
    }

    pub fn is_destructive(&self, tree: &BTreeSet<DeclLocation>) -> bool {
        self.tree_impacts(tree).any(MemberImpact::is_destructive)
    }

    /// Target parameters dependents would force nullable through `tree`.
    pub fn impacted_parameters(&self, tree: &BTreeSet<DeclLocation>) -> BTreeSet<DeclLocation> {
        self.tree_impacts(tree)
            .flat_map(MemberImpact::impacted_parameters)
            .collect()
    }

    /// Report with bounds and the destructive flag attached.
    pub fn attach_bounds(&self, report: Report) -> Report {
        let tree = report.tree_locations();
        let (lower, upper) = (self.lower_bound(&tree), self.upper_bound(&tree));
        let destructive = self.is_destructive(&tree);
        debug!(root = %report.root.location, lower, upper, destructive, "bounds attached");
        report.with_bounds(lower, upper, destructive)
    }

    /// Account for annotations that are now physically present.
    pub fn update_impacts_after_injection(&mut self, injected: &BTreeSet<DeclLocation>) {
        for impact in self.impacts.values_mut() {
            if injected.contains(&impact.member) {
                impact.applied = true;
            }
            impact
                .triggered
                .retain(|t| !t.diagnostic.is_resolved_by(injected));
        }
    }
}

fn is_fixable_on_target<R: DeclarationRegistry + ?Sized>(registry: &R, diagnostic: &Diagnostic) -> bool {
    !diagnostic.resolving_fixes.is_empty()
        && diagnostic
            .resolving_fixes
            .iter()
            .all(|fix| registry.contains(&fix.location))
}

#[allow(clippy::cast_possible_wrap)]
const fn count(n: usize) -> i64 {
    n as i64
}
