//! Nullsweep CLI entry point.

use clap::Parser;

use nullsweep::cli::{handle_error, Cli, Commands};
use nullsweep::infrastructure::config::ConfigLoader;
use nullsweep::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => handle_error(err, cli.json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, cli.json),
    };

    let result = match cli.command {
        Commands::Run(args) => nullsweep::cli::commands::run::execute(args, config, cli.json).await,
        Commands::Config(command) => nullsweep::cli::commands::config::execute(command, &config, cli.json),
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
