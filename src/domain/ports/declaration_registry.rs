//! Declaration registry port - read-only index of the target's declarations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::models::{DeclLocation, Region};

/// A method that could be marked as an initializer, with the fields it
/// assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializerCandidate {
    pub method: DeclLocation,
    #[serde(default)]
    pub initialized_fields: BTreeSet<DeclLocation>,
}

/// Lookups over the parsed declarations of the target module.
///
/// Lookups are synchronous: the index is built before a run and never
/// changes during one.
pub trait DeclarationRegistry: Send + Sync {
    /// Whether `location` is declared in the target module.
    fn contains(&self, location: &DeclLocation) -> bool;

    /// The declaration a region refers to.
    fn lookup(&self, region: &Region) -> Option<DeclLocation>;

    /// The overridden declaration, for methods and their parameters.
    fn super_member(&self, location: &DeclLocation) -> Option<DeclLocation>;

    /// Regions whose diagnostics may change when `location` is annotated.
    fn impacted_regions(&self, location: &DeclLocation) -> BTreeSet<Region>;

    /// Externally visible members with a non-primitive type.
    fn public_members(&self) -> Vec<DeclLocation>;

    fn initializer_candidates(&self, class: &str) -> Vec<InitializerCandidate>;
}
