//! Domain errors for the Nullsweep inference engine.

use thiserror::Error;

/// Domain-level errors that can occur during a run.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The checker or compiler failed for reasons unrelated to nullability.
    #[error("Build failed for [{modules}]: {reason}")]
    BuildFailed { modules: String, reason: String },

    #[error("Injection failed: {0}")]
    InjectionFailed(String),

    #[error("Declaration registry error: {0}")]
    RegistryError(String),

    #[error("Invalid analysis mode: {0}. Must be one of: local, default, lower_bound, upper_bound, strict")]
    InvalidAnalysisMode(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn build_failed(modules: &[String], reason: impl Into<String>) -> Self {
        Self::BuildFailed {
            modules: modules.join(", "),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}
