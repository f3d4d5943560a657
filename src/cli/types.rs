//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::config::ConfigCommands;
use crate::cli::commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "nullsweep")]
#[command(about = "Nullsweep - nullability annotation inference", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .nullsweep/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run annotation inference on the target module
    Run(RunArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}
