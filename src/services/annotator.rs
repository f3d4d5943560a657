//! Round-based orchestration of the inference engine.
//!
//! ```text
//! Idle -> Round(1) -> ... -> Round(n) -> Converged -> FinalSweep -> [ForceResolve] -> Done
//! ```
//!
//! A round snapshots the target, explores every candidate fix the cache has
//! not seen, attaches downstream bounds, tags each report and injects the
//! approved fixes. Rounds repeat until one adds no new report. The final sweep
//! runs one more round with the cache disabled so that candidates rejected
//! before earlier injections are reconsidered.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use super::diagnostic_store::snapshot;
use super::downstream_impact::DownstreamImpactAnalyzer;
use super::explorer::{Explorer, ExplorerSettings};
use super::force_resolver::ForceResolver;
use super::injection::inject;
use super::preprocessor::InitializerPreprocessor;
use super::report_cache::ReportCache;
use super::run_log::RunLog;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AnalysisMode, CandidateFix, Change, Config, DeclLocation, Diagnostic, ExplorationStrategy,
    InjectionPhase, Report, Tag,
};
use crate::domain::ports::{Checker, DeclarationRegistry, Injector};

/// Orchestration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "round", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Round(usize),
    Converged,
    FinalSweep,
    ForceResolve,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Round(n) => write!(f, "round {n}"),
            Self::Converged => write!(f, "converged"),
            Self::FinalSweep => write!(f, "final sweep"),
            Self::ForceResolve => write!(f, "force resolve"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Everything a run hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationOutcome {
    pub mode: AnalysisMode,
    /// Outer rounds before convergence, excluding the final sweep.
    pub rounds: usize,
    pub phases: Vec<Phase>,
    /// Final report for every root seen, tagged.
    pub reports: Vec<Report>,
    /// Triggered diagnostics with several alternative fixes, never chained.
    pub ambiguous: Vec<Diagnostic>,
    pub log: RunLog,
}

impl AnnotationOutcome {
    pub fn approved(&self) -> impl Iterator<Item = &Report> {
        self.reports.iter().filter(|report| report.approved())
    }

    /// Locations that received the nullable annotation.
    pub fn annotated(&self, nullable: &str) -> BTreeSet<&DeclLocation> {
        self.log
            .injected
            .iter()
            .filter(|entry| entry.change.annotation == nullable)
            .map(|entry| &entry.change.location)
            .collect()
    }
}

/// Drives preprocessing, inference rounds and the fallbacks.
pub struct Annotator<C, I, R> {
    checker: Arc<C>,
    injector: Arc<I>,
    registry: Arc<R>,
    config: Config,
    mode: AnalysisMode,
    explorer: Explorer<C, I, R>,
    cache: ReportCache,
    downstream: DownstreamImpactAnalyzer,
    phases: Vec<Phase>,
    log: RunLog,
}

impl<C, I, R> Annotator<C, I, R>
where
    C: Checker + 'static,
    I: Injector,
    R: DeclarationRegistry,
{
    pub fn new(checker: Arc<C>, injector: Arc<I>, registry: Arc<R>, config: Config) -> Self {
        let explorer = Explorer::new(
            checker.clone(),
            injector.clone(),
            registry.clone(),
            ExplorerSettings::from_config(&config),
        );
        Self {
            mode: config.effective_mode(),
            cache: ReportCache::new(config.inference.cache),
            checker,
            injector,
            registry,
            config,
            explorer,
            downstream: DownstreamImpactAnalyzer::disabled(),
            phases: Vec::new(),
            log: RunLog::new(),
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phases.last().copied()
    }

    fn enter(&mut self, phase: Phase) {
        info!(%phase, "entering phase");
        self.phases.push(phase);
    }

    #[instrument(skip_all, fields(target = %self.config.target_module, mode = %self.mode))]
    pub async fn run(mut self) -> DomainResult<AnnotationOutcome> {
        let started = Instant::now();
        self.enter(Phase::Idle);

        if let Some(annotation) = self.config.annotations.initializer.clone() {
            InitializerPreprocessor::new(
                self.checker.as_ref(),
                self.injector.as_ref(),
                self.registry.as_ref(),
                &self.config.target_module,
                &annotation,
            )
            .run(&mut self.log)
            .await?;
        }

        if self.config.inference.downstream_analysis {
            self.downstream = DownstreamImpactAnalyzer::analyze(
                self.checker.clone(),
                self.registry.as_ref(),
                &self.config.downstream_modules,
                self.config.execution.max_workers,
                &mut self.log,
            )
            .await?;
        }

        let mut rounds = 0;
        if self.config.inference.enabled {
            loop {
                rounds += 1;
                self.enter(Phase::Round(rounds));
                self.execute_round(InjectionPhase::Round(rounds)).await?;
                if !self.cache.is_updated() || !self.config.inference.outer_loop {
                    break;
                }
            }
            self.enter(Phase::Converged);

            self.enter(Phase::FinalSweep);
            self.cache.disable();
            self.execute_round(InjectionPhase::FinalSweep).await?;
            self.cache.enable();
        }

        if self.config.inference.force_resolve {
            self.enter(Phase::ForceResolve);
            ForceResolver::new(
                self.checker.as_ref(),
                self.injector.as_ref(),
                self.registry.as_ref(),
                &self.config.target_module,
                &self.config.annotations,
            )
            .resolve(&mut self.log)
            .await?;
        }

        self.enter(Phase::Done);
        self.log.finish(started.elapsed());

        let reports = self.cache.into_reports();
        let ambiguous: BTreeSet<Diagnostic> = reports
            .iter()
            .flat_map(|report| report.ambiguous_diagnostics().cloned())
            .collect();
        info!(
            rounds,
            reports = reports.len(),
            injected = self.log.injected.len(),
            builds = self.log.builds,
            "run finished"
        );

        Ok(AnnotationOutcome {
            mode: self.mode,
            rounds,
            phases: self.phases,
            reports,
            ambiguous: ambiguous.into_iter().collect(),
            log: self.log,
        })
    }

    async fn execute_round(&mut self, phase: InjectionPhase) -> DomainResult<()> {
        let baseline = snapshot(self.checker.as_ref(), &self.config.target_module, &mut self.log).await?;
        let candidates: BTreeSet<CandidateFix> = baseline
            .fixes()
            .into_iter()
            .filter(|fix| self.registry.contains(&fix.location) && !self.cache.processed(fix))
            .collect();
        info!(%phase, diagnostics = baseline.len(), candidates = candidates.len(), "round started");

        let reports = self
            .explorer
            .evaluate(&candidates, &baseline, &self.downstream, &mut self.log)
            .await?;
        let reports: Vec<Report> = reports.into_iter().map(|report| self.decide(report)).collect();

        let selected: BTreeSet<CandidateFix> = reports
            .iter()
            .filter(|report| report.approved())
            .flat_map(|report| report.selected_fixes(self.config.inference.chain))
            .filter(|fix| self.registry.contains(&fix.location))
            .collect();
        info!(
            %phase,
            approved = reports.iter().filter(|r| r.approved()).count(),
            rejected = reports.iter().filter(|r| !r.approved()).count(),
            "round decided"
        );

        self.cache.update(reports);
        self.apply_selected(&selected, phase).await
    }

    fn decide(&self, report: Report) -> Report {
        if !report.is_converged() {
            debug!(root = %report.root.location, depth = report.depth, "depth limit left downstream obligations outside the tree");
        }
        let report = if self.downstream.is_enabled() {
            self.downstream.attach_bounds(report)
        } else {
            report
        };
        let tag = if self.config.inference.strategy == ExplorationStrategy::Exhaustive {
            Tag::Approve
        } else {
            self.mode.tag(&report)
        };
        report.with_tag(tag)
    }

    /// Inject approved fixes and bring every dependent structure up to date
    /// with the new source state.
    async fn apply_selected(&mut self, selected: &BTreeSet<CandidateFix>, phase: InjectionPhase) -> DomainResult<()> {
        let changes: Vec<Change> = selected
            .iter()
            .map(|fix| fix.to_change(&self.config.annotations.nullable))
            .collect();
        let applied = inject(self.injector.as_ref(), &changes, phase, &mut self.log).await?;
        if applied.is_empty() {
            return Ok(());
        }

        let locations: BTreeSet<DeclLocation> = applied.into_iter().map(|change| change.location).collect();
        self.downstream.update_impacts_after_injection(&locations);
        self.explorer.invalidate();
        Ok(())
    }
}
