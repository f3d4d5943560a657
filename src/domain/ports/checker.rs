//! Checker port - interface to the build that runs the static checker.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::errors::DomainResult;
use crate::domain::models::diagnostic::merge_fixes;
use crate::domain::models::{CandidateFix, DeclLocation, Diagnostic};

/// What to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub modules: Vec<String>,
    /// Target declarations the checker must treat as nullable without any
    /// source change. Used for the hypothetical downstream builds.
    #[serde(default)]
    pub assume_nullable: BTreeSet<DeclLocation>,
}

impl BuildRequest {
    pub fn module(module: impl Into<String>) -> Self {
        Self {
            modules: vec![module.into()],
            assume_nullable: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn assuming(mut self, locations: BTreeSet<DeclLocation>) -> Self {
        self.assume_nullable = locations;
        self
    }
}

/// Diagnostics per built module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    pub outputs: BTreeMap<String, Vec<Diagnostic>>,
}

impl BuildResult {
    pub fn diagnostics(&self, module: &str) -> &[Diagnostic] {
        self.outputs.get(module).map_or(&[], Vec::as_slice)
    }

    /// Resolving fixes of a module's diagnostics, one per location with
    /// reasons merged.
    pub fn fixes(&self, module: &str) -> BTreeSet<CandidateFix> {
        merge_fixes(
            self.diagnostics(module)
                .iter()
                .flat_map(|d| d.resolving_fixes.iter()),
        )
    }
}

/// Runs the external static checker.
///
/// Implementations must not mutate source; a failure of the build itself
/// (as opposed to reported diagnostics) is `DomainError::BuildFailed`.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> DomainResult<BuildResult>;
}
