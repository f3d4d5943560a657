use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Target module cannot be empty")]
    EmptyTargetModule,

    #[error("Invalid depth: {0}. Must be between 1 and 32")]
    InvalidDepth(usize),

    #[error("Invalid max_workers: {0}. Must be between 1 and 64")]
    InvalidMaxWorkers(usize),

    #[error("Invalid max_group_size: {0}. Must be at least 1")]
    InvalidMaxGroupSize(usize),

    #[error("Nullable annotation cannot be empty")]
    EmptyNullableAnnotation,

    #[error("Downstream analysis is enabled but no downstream modules are configured")]
    NoDownstreamModules,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .nullsweep/config.yaml (project config)
    /// 3. .nullsweep/local.yaml (project local overrides, optional)
    /// 4. Environment variables (NULLSWEEP_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".nullsweep/config.yaml"))
            .merge(Yaml::file(".nullsweep/local.yaml"))
            .merge(Env::prefixed("NULLSWEEP_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("NULLSWEEP_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.target_module.trim().is_empty() {
            return Err(ConfigError::EmptyTargetModule);
        }

        let inference = &config.inference;
        if inference.depth == 0 || inference.depth > 32 {
            return Err(ConfigError::InvalidDepth(inference.depth));
        }

        if inference.downstream_analysis && config.downstream_modules.is_empty() {
            return Err(ConfigError::NoDownstreamModules);
        }

        let execution = &config.execution;
        if execution.max_workers == 0 || execution.max_workers > 64 {
            return Err(ConfigError::InvalidMaxWorkers(execution.max_workers));
        }

        if execution.max_group_size == 0 {
            return Err(ConfigError::InvalidMaxGroupSize(execution.max_group_size));
        }

        if config.annotations.nullable.trim().is_empty() {
            return Err(ConfigError::EmptyNullableAnnotation);
        }

        if config.downstream_modules.contains(&config.target_module) {
            return Err(ConfigError::ValidationFailed(format!(
                "target module '{}' cannot also be a downstream module",
                config.target_module
            )));
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}
