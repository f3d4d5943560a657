//! Initializer marking before the first inference round.
//!
//! Fields reported as never initialized are often set up by a method the
//! checker does not know runs first. Marking such a method as an initializer
//! removes those diagnostics without making the fields nullable.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

use super::diagnostic_store::snapshot;
use super::injection::inject;
use super::run_log::RunLog;
use crate::domain::errors::DomainResult;
use crate::domain::models::{kinds, Change, DeclLocation, Diagnostic, InjectionPhase};
use crate::domain::ports::{Checker, DeclarationRegistry, InitializerCandidate, Injector};

pub struct InitializerPreprocessor<'a, C: ?Sized, I: ?Sized, R: ?Sized> {
    checker: &'a C,
    injector: &'a I,
    registry: &'a R,
    target_module: &'a str,
    annotation: &'a str,
}

impl<'a, C, I, R> InitializerPreprocessor<'a, C, I, R>
where
    C: Checker + ?Sized,
    I: Injector + ?Sized,
    R: DeclarationRegistry + ?Sized,
{
    pub const fn new(
        checker: &'a C,
        injector: &'a I,
        registry: &'a R,
        target_module: &'a str,
        annotation: &'a str,
    ) -> Self {
        Self {
            checker,
            injector,
            registry,
            target_module,
            annotation,
        }
    }

    /// Mark one initializer per class with uninitialized fields. Returns the
    /// injected changes.
    #[instrument(skip_all, fields(module = self.target_module))]
    pub async fn run(&self, log: &mut RunLog) -> DomainResult<Vec<Change>> {
        let store = snapshot(self.checker, self.target_module, log).await?;

        let mut uninitialized: BTreeMap<String, BTreeSet<DeclLocation>> = BTreeMap::new();
        for diagnostic in store.diagnostics() {
            for field in self.uninitialized_fields(diagnostic) {
                uninitialized
                    .entry(field.class().to_string())
                    .or_default()
                    .insert(field);
            }
        }

        let changes: Vec<Change> = uninitialized
            .iter()
            .filter_map(|(class, fields)| {
                let chosen = choose_initializer(self.registry.initializer_candidates(class), fields)?;
                debug!(%class, method = %chosen, "initializer selected");
                Some(Change::marker(chosen, self.annotation))
            })
            .collect();

        inject(self.injector, &changes, InjectionPhase::Preprocess, log).await
    }

    fn uninitialized_fields(&self, diagnostic: &Diagnostic) -> Vec<DeclLocation> {
        if diagnostic.is_kind(kinds::FIELD_NO_INIT) {
            if let Some(field) = self
                .registry
                .lookup(&diagnostic.region)
                .filter(DeclLocation::is_field)
            {
                return vec![field];
            }
        }
        if diagnostic.is_kind(kinds::FIELD_NO_INIT) || diagnostic.is_kind(kinds::METHOD_NO_INIT) {
            return diagnostic
                .resolving_fixes
                .iter()
                .map(|fix| fix.location.clone())
                .filter(DeclLocation::is_field)
                .collect();
        }
        Vec::new()
    }
}

/// Candidate covering the most uninitialized fields; ties go to the first
/// method in location order.
fn choose_initializer(
    candidates: Vec<InitializerCandidate>,
    fields: &BTreeSet<DeclLocation>,
) -> Option<DeclLocation> {
    candidates
        .into_iter()
        .map(|candidate| {
            let covered = candidate.initialized_fields.intersection(fields).count();
            (covered, candidate.method)
        })
        .filter(|(covered, _)| *covered > 0)
        .max_by(|(a, a_method), (b, b_method)| a.cmp(b).then_with(|| b_method.cmp(a_method)))
        .map(|(_, method)| method)
}
