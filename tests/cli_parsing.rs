use clap::Parser;
use nullsweep::cli::commands::config::ConfigCommands;
use nullsweep::cli::{Cli, Commands};
use nullsweep::domain::models::{AnalysisMode, ExplorationStrategy};
use std::path::PathBuf;

#[test]
fn test_parse_run_with_overrides() {
    let cli = Cli::try_parse_from([
        "nullsweep",
        "run",
        "--depth",
        "3",
        "--mode",
        "upper_bound",
        "--strategy",
        "cached",
        "--chain",
        "--force-resolve",
    ])
    .unwrap();

    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.depth, Some(3));
            assert_eq!(args.mode, Some(AnalysisMode::UpperBound));
            assert_eq!(args.strategy, Some(ExplorationStrategy::Cached));
            assert!(args.chain);
            assert!(args.force_resolve);
            assert!(!args.no_outer_loop);
        }
        Commands::Config(_) => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_default_mode_alias() {
    let cli = Cli::try_parse_from(["nullsweep", "run", "-m", "default"]).unwrap();
    match cli.command {
        Commands::Run(args) => assert_eq!(args.mode, Some(AnalysisMode::LowerBound)),
        Commands::Config(_) => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_rejects_unknown_mode() {
    assert!(Cli::try_parse_from(["nullsweep", "run", "--mode", "lenient"]).is_err());
    assert!(Cli::try_parse_from(["nullsweep", "run", "--strategy", "greedy"]).is_err());
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "nullsweep",
        "config",
        "show",
        "--json",
        "--config",
        "ci/nullsweep.yaml",
    ])
    .unwrap();

    assert!(cli.json);
    assert_eq!(cli.config, Some(PathBuf::from("ci/nullsweep.yaml")));
    assert!(matches!(cli.command, Commands::Config(ConfigCommands::Show)));
}
