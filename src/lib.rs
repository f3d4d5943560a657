//! Nullsweep - nullability annotation inference
//!
//! Nullsweep drives an external nullness checker over a module, explores the
//! consequences of marking declarations `@Nullable`, and keeps only the
//! annotations that reduce the number of reported errors.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Locations, diagnostics, reports and the ports
//!   to the checker, injector and declaration registry
//! - **Service Layer** (`services`): Exploration, decision and injection loop
//! - **Adapters** (`adapters`): Command-driven checker and injector, JSON registry
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nullsweep::{Annotator, CommandChecker, CommandInjector, ConfigLoader, JsonDeclarationRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let registry = JsonDeclarationRegistry::load(&config.registry.declarations_path).await?;
//!     let annotator = Annotator::new(
//!         Arc::new(CommandChecker::from_config(&config)),
//!         Arc::new(CommandInjector::from_config(&config)),
//!         Arc::new(registry),
//!         config,
//!     );
//!     let outcome = annotator.run().await?;
//!     println!("{} report(s)", outcome.reports.len());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{CommandChecker, CommandInjector, JsonDeclarationRegistry};
pub use domain::models::{
    AnalysisMode, CandidateFix, Change, Config, DeclLocation, Diagnostic, Region, Report, Tag,
};
pub use domain::ports::{Checker, DeclarationRegistry, Injector};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AnnotationOutcome, Annotator};
