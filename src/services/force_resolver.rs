//! Terminal fallback: silence what inference could not fix.
//!
//! Remaining diagnostics are relaxed at the narrowest declaration that covers
//! them. Method bodies get the enclosing method relaxed, field declarations get
//! a local suppression, and whatever is still reported after that gets its
//! class relaxed.

use std::collections::BTreeSet;
use tracing::{info, instrument};

use super::diagnostic_store::snapshot;
use super::injection::inject;
use super::run_log::RunLog;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    kinds, AnnotationConfig, Change, DeclLocation, Diagnostic, InjectionPhase, Region, RegionKind,
};
use crate::domain::ports::{Checker, DeclarationRegistry, Injector};

pub struct ForceResolver<'a, C: ?Sized, I: ?Sized, R: ?Sized> {
    checker: &'a C,
    injector: &'a I,
    registry: &'a R,
    target_module: &'a str,
    annotations: &'a AnnotationConfig,
}

impl<'a, C, I, R> ForceResolver<'a, C, I, R>
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
        annotations: &'a AnnotationConfig,
    ) -> Self {
        Self {
            checker,
            injector,
            registry,
            target_module,
            annotations,
        }
    }

    /// Suppress every remaining diagnostic. Returns the injected changes.
    #[instrument(skip_all, fields(module = self.target_module))]
    pub async fn resolve(&self, log: &mut RunLog) -> DomainResult<Vec<Change>> {
        let store = snapshot(self.checker, self.target_module, log).await?;
        if store.is_empty() {
            return Ok(Vec::new());
        }
        let remaining: Vec<&Diagnostic> = store.diagnostics().collect();

        let mut relaxed: BTreeSet<DeclLocation> = BTreeSet::new();
        let mut suppressed: BTreeSet<DeclLocation> = BTreeSet::new();
        let mut init_suppressed: BTreeSet<DeclLocation> = BTreeSet::new();

        for diagnostic in &remaining {
            let region = &diagnostic.region;
            if diagnostic.is_kind(kinds::PASS_NULLABLE) {
                if let Some(method) = diagnostic
                    .single_fix()
                    .filter(|fix| fix.location.is_parameter())
                    .and_then(|fix| fix.location.enclosing_method())
                    .filter(|method| self.registry.contains(method))
                {
                    relaxed.insert(method);
                    continue;
                }
            }
            match region.kind() {
                RegionKind::Method | RegionKind::Constructor => {
                    if !diagnostic.is_kind(kinds::METHOD_NO_INIT) {
                        relaxed.insert(self.method_at(region));
                    }
                }
                RegionKind::Initializer => {
                    if !region.is_in_anonymous_class() {
                        relaxed.insert(DeclLocation::class_decl(region.class.clone()));
                    }
                }
                RegionKind::Field => {
                    if ![kinds::PASS_NULLABLE, kinds::FIELD_NO_INIT, kinds::METHOD_NO_INIT]
                        .iter()
                        .any(|kind| diagnostic.is_kind(kind))
                    {
                        suppressed.insert(self.field_at(region));
                    }
                }
            }
        }

        for fix in remaining.iter().flat_map(|d| d.resolving_fixes.iter()) {
            let uninitialized = fix.has_reason(kinds::FIELD_NO_INIT) || fix.has_reason(kinds::METHOD_NO_INIT);
            if uninitialized && fix.location.is_field() && !suppressed.contains(&fix.location) {
                init_suppressed.insert(fix.location.clone());
            }
        }

        let mut changes: Vec<Change> = relaxed
            .iter()
            .map(|location| Change::marker(location.clone(), &self.annotations.null_unmarked))
            .collect();
        changes.extend(suppressed.iter().map(|field| {
            Change::with_argument(
                field.clone(),
                &self.annotations.suppress_warnings,
                &self.annotations.suppression_key,
            )
        }));
        changes.extend(init_suppressed.iter().map(|field| {
            Change::with_argument(
                field.clone(),
                &self.annotations.suppress_warnings,
                &self.annotations.init_suppression_key,
            )
        }));

        let mut injected = inject(self.injector, &changes, InjectionPhase::ForceResolve, log).await?;

        let store = snapshot(self.checker, self.target_module, log).await?;
        let classes: BTreeSet<DeclLocation> = store
            .diagnostics()
            .filter(|d| !d.region.is_in_anonymous_class())
            .map(|d| DeclLocation::class_decl(d.region.class.clone()))
            .filter(|class| !relaxed.contains(class))
            .collect();
        let class_changes: Vec<Change> = classes
            .into_iter()
            .map(|class| Change::marker(class, &self.annotations.null_unmarked))
            .collect();
        injected.extend(inject(self.injector, &class_changes, InjectionPhase::ForceResolve, log).await?);

        info!(
            diagnostics = remaining.len(),
            changes = injected.len(),
            "remaining diagnostics force-resolved"
        );
        Ok(injected)
    }

    fn method_at(&self, region: &Region) -> DeclLocation {
        self.registry
            .lookup(region)
            .and_then(|location| location.enclosing_method())
            .unwrap_or_else(|| {
                DeclLocation::method(region.class.clone(), region.member.clone().unwrap_or_default())
            })
    }

    fn field_at(&self, region: &Region) -> DeclLocation {
        self.registry
            .lookup(region)
            .filter(DeclLocation::is_field)
            .unwrap_or_else(|| {
                DeclLocation::field(region.class.clone(), region.member.clone().unwrap_or_default())
            })
    }
}
