//! Process and file backed implementations of the domain ports.

pub mod command_checker;
pub mod command_injector;
pub mod json_registry;

pub use command_checker::CommandChecker;
pub use command_injector::CommandInjector;
pub use json_registry::{DeclarationIndex, DeclarationRecord, JsonDeclarationRegistry};
