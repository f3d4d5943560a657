//! Injector port - interface to the source rewriting tool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;
use crate::domain::models::Change;

/// Per-change result of an injection request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionOutcome {
    /// Changes that could not be written.
    #[serde(default)]
    pub failed: Vec<Change>,
}

impl InjectionOutcome {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// The requested changes minus the failed ones.
    pub fn applied<'a>(&self, requested: &'a [Change]) -> Vec<&'a Change> {
        requested
            .iter()
            .filter(|change| !self.failed.contains(change))
            .collect()
    }
}

/// Adds and removes annotations in the target's source.
///
/// Both operations are idempotent: applying a present annotation or removing
/// an absent one is a no-op.
#[async_trait]
pub trait Injector: Send + Sync {
    async fn apply(&self, changes: &[Change]) -> DomainResult<InjectionOutcome>;

    async fn remove(&self, changes: &[Change]) -> DomainResult<InjectionOutcome>;
}
