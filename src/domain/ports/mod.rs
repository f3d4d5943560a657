//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces to the collaborators the engine drives but does not implement:
//! - Checker: builds modules and reports diagnostics
//! - Injector: writes annotations into source
//! - DeclarationRegistry: read-only declaration index

pub mod checker;
pub mod declaration_registry;
pub mod injector;

pub use checker::{BuildRequest, BuildResult, Checker};
pub use declaration_registry::{DeclarationRegistry, InitializerCandidate};
pub use injector::{InjectionOutcome, Injector};
