//! Common test utilities for integration tests
//!
//! Provides an in-memory project that plays the checker and the injector,
//! plus fixtures shared across integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use nullsweep::adapters::{DeclarationIndex, DeclarationRecord, JsonDeclarationRegistry};
use nullsweep::domain::models::{CandidateFix, Change, Config, DeclLocation, Diagnostic, Region};
use nullsweep::domain::ports::{
    BuildRequest, BuildResult, Checker, InitializerCandidate, InjectionOutcome, Injector,
};
use nullsweep::domain::{DomainError, DomainResult};

pub const TARGET: &str = "main";
pub const NULLABLE: &str = "javax.annotation.Nullable";
pub const NULL_UNMARKED: &str = "org.jspecify.annotations.NullUnmarked";
pub const SUPPRESS_WARNINGS: &str = "SuppressWarnings";

/// One diagnostic the simulated checker may report.
#[derive(Debug, Clone)]
pub struct Rule {
    pub module: String,
    pub diagnostic: Diagnostic,
    /// Reported only while all of these are nullable.
    pub requires: BTreeSet<DeclLocation>,
    /// Gone as soon as any of these is nullable.
    pub absent_if: BTreeSet<DeclLocation>,
    /// Gone once this exact change is applied.
    pub cleared_by: Option<Change>,
}

impl Rule {
    pub fn target(diagnostic: Diagnostic) -> Self {
        Self::in_module(TARGET, diagnostic)
    }

    pub fn in_module(module: &str, diagnostic: Diagnostic) -> Self {
        Self {
            module: module.to_string(),
            diagnostic,
            requires: BTreeSet::new(),
            absent_if: BTreeSet::new(),
            cleared_by: None,
        }
    }

    pub fn requires(mut self, location: DeclLocation) -> Self {
        self.requires.insert(location);
        self
    }

    pub fn absent_if(mut self, location: DeclLocation) -> Self {
        self.absent_if.insert(location);
        self
    }

    pub fn cleared_by(mut self, change: Change) -> Self {
        self.cleared_by = Some(change);
        self
    }

    fn active(&self, nullable: &BTreeSet<DeclLocation>, applied: &BTreeSet<Change>) -> bool {
        self.requires.is_subset(nullable)
            && self.absent_if.is_disjoint(nullable)
            && !self.cleared_by.as_ref().is_some_and(|change| applied.contains(change))
            && !applied.iter().any(|change| suppresses(change, &self.diagnostic.region))
    }
}

/// Relaxed classes and methods, and suppressed fields, hide their diagnostics.
fn suppresses(change: &Change, region: &Region) -> bool {
    match &change.location {
        DeclLocation::Class { class } if change.annotation == NULL_UNMARKED => &region.class == class,
        DeclLocation::Method { .. } if change.annotation == NULL_UNMARKED => {
            &change.location.region() == region
        }
        DeclLocation::Field { .. } if change.annotation == SUPPRESS_WARNINGS => {
            &change.location.region() == region
        }
        _ => false,
    }
}

#[derive(Debug, Default)]
struct State {
    applied: BTreeSet<Change>,
    builds: usize,
    fail_after: Option<usize>,
    requests: Vec<BuildRequest>,
}

/// In-memory project acting as checker and injector.
///
/// Nullable annotations applied through the injector, plus any locations a
/// build request assumes nullable, decide which rules fire.
#[derive(Debug, Default)]
pub struct SimulatedProject {
    rules: Vec<Rule>,
    index: DeclarationIndex,
    unappliable: BTreeSet<DeclLocation>,
    state: Mutex<State>,
}

impl SimulatedProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Register a private declaration of the target.
    pub fn declare(self, location: DeclLocation) -> Self {
        self.record(DeclarationRecord {
            location,
            public: false,
            non_primitive: true,
            super_member: None,
            impacted_regions: BTreeSet::new(),
        })
    }

    /// Register a public declaration of the target.
    pub fn declare_public(self, location: DeclLocation) -> Self {
        self.record(DeclarationRecord {
            location,
            public: true,
            non_primitive: true,
            super_member: None,
            impacted_regions: BTreeSet::new(),
        })
    }

    pub fn record(mut self, record: DeclarationRecord) -> Self {
        self.index.declarations.push(record);
        self
    }

    pub fn initializer(mut self, class: &str, method: DeclLocation, fields: &[DeclLocation]) -> Self {
        self.index
            .initializers
            .entry(class.to_string())
            .or_default()
            .push(InitializerCandidate {
                method,
                initialized_fields: fields.iter().cloned().collect(),
            });
        self
    }

    /// Injection of any change at `location` reports failure.
    pub fn unappliable(mut self, location: DeclLocation) -> Self {
        self.unappliable.insert(location);
        self
    }

    pub fn registry(&self) -> JsonDeclarationRegistry {
        JsonDeclarationRegistry::from_index(self.index.clone())
    }

    pub fn fail_builds_after(&self, builds: usize) {
        self.state.lock().unwrap().fail_after = Some(builds);
    }

    pub fn builds(&self) -> usize {
        self.state.lock().unwrap().builds
    }

    pub fn requests(&self) -> Vec<BuildRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn applied(&self) -> BTreeSet<Change> {
        self.state.lock().unwrap().applied.clone()
    }

    pub fn nullable_locations(&self) -> BTreeSet<DeclLocation> {
        self.applied()
            .into_iter()
            .filter(|change| change.annotation == NULLABLE)
            .map(|change| change.location)
            .collect()
    }

    /// Diagnostics of `module` in the current source state.
    pub fn current(&self, module: &str) -> Vec<Diagnostic> {
        let state = self.state.lock().unwrap();
        self.diagnostics_for(module, &BTreeSet::new(), &state.applied)
    }

    fn diagnostics_for(
        &self,
        module: &str,
        assumed: &BTreeSet<DeclLocation>,
        applied: &BTreeSet<Change>,
    ) -> Vec<Diagnostic> {
        let nullable: BTreeSet<DeclLocation> = applied
            .iter()
            .filter(|change| change.annotation == NULLABLE)
            .map(|change| change.location.clone())
            .chain(assumed.iter().cloned())
            .collect();
        self.rules
            .iter()
            .filter(|rule| rule.module == module && rule.active(&nullable, applied))
            .map(|rule| rule.diagnostic.clone())
            .collect()
    }
}

#[async_trait]
impl Checker for SimulatedProject {
    async fn build(&self, request: &BuildRequest) -> DomainResult<BuildResult> {
        let mut state = self.state.lock().unwrap();
        state.builds += 1;
        state.requests.push(request.clone());
        if state.fail_after.is_some_and(|limit| state.builds > limit) {
            return Err(DomainError::build_failed(&request.modules, "simulated compiler crash"));
        }

        let outputs = request
            .modules
            .iter()
            .map(|module| {
                let diagnostics = self.diagnostics_for(module, &request.assume_nullable, &state.applied);
                (module.clone(), diagnostics)
            })
            .collect::<BTreeMap<_, _>>();
        Ok(BuildResult { outputs })
    }
}

#[async_trait]
impl Injector for SimulatedProject {
    async fn apply(&self, changes: &[Change]) -> DomainResult<InjectionOutcome> {
        let mut state = self.state.lock().unwrap();
        let mut outcome = InjectionOutcome::default();
        for change in changes {
            if self.unappliable.contains(&change.location) {
                outcome.failed.push(change.clone());
            } else {
                state.applied.insert(change.clone());
            }
        }
        Ok(outcome)
    }

    async fn remove(&self, changes: &[Change]) -> DomainResult<InjectionOutcome> {
        let mut state = self.state.lock().unwrap();
        for change in changes {
            state.applied.remove(change);
        }
        Ok(InjectionOutcome::default())
    }
}

/// Configuration for tests: local decisions, sequential measurement.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.target_module = TARGET.to_string();
    config.execution.parallel_processing = false;
    config
}

/// Diagnostic in `class#member` resolved by annotating `fix`.
pub fn diag(kind: &str, message: &str, class: &str, member: &str, fix: Option<&DeclLocation>) -> Diagnostic {
    let diagnostic = Diagnostic::new(kind, message, Region::member(class, member));
    match fix {
        Some(location) => diagnostic.with_fix(CandidateFix::new(location.clone(), kind)),
        None => diagnostic,
    }
}

/// Chain project: `m0` resolves two diagnostics, and every `m<i>` made
/// nullable pushes one new diagnostic onto `m<i+1>` until the last method.
pub fn chain_project(length: usize) -> SimulatedProject {
    let method = |i: usize| DeclLocation::method("a.Chain", format!("m{i}()"));
    let mut project = SimulatedProject::new()
        .rule(Rule::target(diag("RETURN_NULLABLE", "m0 returns null", "a.Chain", "m0()", Some(&method(0)))).absent_if(method(0)))
        .rule(
            Rule::target(diag("RETURN_NULLABLE", "m0 returns null again", "a.Chain", "m0()", Some(&method(0))))
                .absent_if(method(0)),
        );
    for i in 0..length {
        project = project.declare(method(i));
        if i + 1 < length {
            let message = format!("returning nullable m{i}() from m{}()", i + 1);
            project = project.rule(
                Rule::target(diag("RETURN_NULLABLE", &message, "a.Chain", &format!("m{}()", i + 1), Some(&method(i + 1))))
                    .requires(method(i))
                    .absent_if(method(i + 1)),
            );
        }
    }
    project
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
