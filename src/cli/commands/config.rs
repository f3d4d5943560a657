//! Implementation of the `nullsweep config` commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration after all layers are merged
    Show,
    /// Check the configuration and report problems
    Validate,
}

#[derive(Debug, Serialize)]
pub struct ConfigShowOutput {
    pub config: Config,
}

impl CommandOutput for ConfigShowOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_else(|e| format!("<unprintable: {e}>"))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigValidateOutput {
    pub valid: bool,
    pub target_module: String,
    pub mode: String,
    pub error: Option<String>,
}

impl CommandOutput for ConfigValidateOutput {
    fn to_human(&self) -> String {
        match &self.error {
            None => format!(
                "Configuration is valid (target module '{}', {} mode)",
                self.target_module, self.mode
            ),
            Some(error) => format!("Configuration is invalid: {error}"),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub fn execute(command: ConfigCommands, config: &Config, json_mode: bool) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            output(&ConfigShowOutput { config: config.clone() }, json_mode);
            Ok(())
        }
        ConfigCommands::Validate => {
            let result = ConfigLoader::validate(config);
            let out = ConfigValidateOutput {
                valid: result.is_ok(),
                target_module: config.target_module.clone(),
                mode: config.effective_mode().to_string(),
                error: result.as_ref().err().map(ToString::to_string),
            };
            output(&out, json_mode);
            result.context("Configuration validation failed")
        }
    }
}
