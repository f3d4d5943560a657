//! Implementation of the `nullsweep run` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::adapters::{CommandChecker, CommandInjector, JsonDeclarationRegistry};
use crate::cli::output::{create_spinner_with_message, output, CommandOutput, ProgressBarExt, TableFormatter};
use crate::domain::models::{AnalysisMode, Config, ExplorationStrategy, InjectedChange, Report};
use crate::infrastructure::config::ConfigLoader;
use crate::services::{AnnotationOutcome, Annotator};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Maximum exploration depth per candidate fix
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Analysis mode (local, lower_bound, upper_bound, strict)
    #[arg(short, long)]
    pub mode: Option<AnalysisMode>,

    /// Exploration strategy
    #[arg(long, value_parser = parse_strategy)]
    pub strategy: Option<ExplorationStrategy>,

    /// Inject the whole fix tree of approved reports, not just the root
    #[arg(long)]
    pub chain: bool,

    /// Stop after a single round
    #[arg(long)]
    pub no_outer_loop: bool,

    /// Skip downstream impact analysis
    #[arg(long)]
    pub no_downstream: bool,

    /// Suppress remaining errors once inference has converged
    #[arg(long)]
    pub force_resolve: bool,

    /// Override the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(depth) = self.depth {
            config.inference.depth = depth;
        }
        if let Some(mode) = self.mode {
            config.inference.mode = mode;
        }
        if let Some(strategy) = self.strategy {
            config.inference.strategy = strategy;
        }
        if self.chain {
            config.inference.chain = true;
        }
        if self.no_outer_loop {
            config.inference.outer_loop = false;
        }
        if self.no_downstream {
            config.inference.downstream_analysis = false;
        }
        if self.force_resolve {
            config.inference.force_resolve = true;
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir.clone_from(dir);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub run_id: String,
    pub mode: AnalysisMode,
    pub rounds: usize,
    pub builds: u64,
    pub build_time_ms: u64,
    pub total_time_ms: u64,
    pub approved: usize,
    pub rejected: usize,
    pub ambiguous: usize,
    pub unresolved_regions: usize,
    pub output_dir: PathBuf,
    pub reports: Vec<Report>,
    pub injected: Vec<InjectedChange>,
}

impl RunOutput {
    fn from_outcome(outcome: AnnotationOutcome, output_dir: PathBuf) -> Self {
        let approved = outcome.approved().count();
        Self {
            run_id: outcome.log.run_id.to_string(),
            mode: outcome.mode,
            rounds: outcome.rounds,
            builds: outcome.log.builds,
            build_time_ms: outcome.log.build_time_ms,
            total_time_ms: outcome.log.total_time_ms,
            approved,
            rejected: outcome.reports.len() - approved,
            ambiguous: outcome.ambiguous.len(),
            unresolved_regions: outcome.log.unresolved_regions.len(),
            output_dir,
            reports: outcome.reports,
            injected: outcome.log.injected,
        }
    }
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut lines = vec![format!(
            "Run {} finished in {} round(s) ({} mode)",
            self.run_id, self.rounds, self.mode
        )];
        lines.push(format!(
            "  {} build(s), {} ms building, {} ms total",
            self.builds, self.build_time_ms, self.total_time_ms
        ));
        lines.push(format!(
            "  {} approved, {} rejected, {} ambiguous diagnostic(s), {} unresolved region(s)",
            self.approved, self.rejected, self.ambiguous, self.unresolved_regions
        ));

        if !self.reports.is_empty() {
            lines.push(String::new());
            lines.push(formatter.format_reports(&self.reports));
        }
        if !self.injected.is_empty() {
            lines.push(String::new());
            lines.push(formatter.format_injected(&self.injected));
        }
        lines.push(format!("\nResults written to {}", self.output_dir.display()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn parse_strategy(value: &str) -> Result<ExplorationStrategy, String> {
    match value.to_ascii_lowercase().as_str() {
        "basic" => Ok(ExplorationStrategy::Basic),
        "cached" => Ok(ExplorationStrategy::Cached),
        "exhaustive" => Ok(ExplorationStrategy::Exhaustive),
        other => Err(format!("unknown strategy '{other}' (expected basic, cached or exhaustive)")),
    }
}

pub async fn execute(args: RunArgs, mut config: Config, json_mode: bool) -> Result<()> {
    args.apply(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration after applying overrides")?;

    let registry = JsonDeclarationRegistry::load(&config.registry.declarations_path)
        .await
        .context("Failed to load declaration index")?;
    let checker = CommandChecker::from_config(&config);
    let injector = CommandInjector::from_config(&config);
    let output_dir = config.output_dir.clone();

    let spinner = create_spinner_with_message(
        format!("Inferring annotations for {}", config.target_module),
        json_mode,
    );
    let annotator = Annotator::new(Arc::new(checker), Arc::new(injector), Arc::new(registry), config);
    let outcome = match annotator.run().await {
        Ok(outcome) => {
            spinner.finish_success("Inference finished");
            outcome
        }
        Err(err) => {
            spinner.finish_error("Inference failed");
            return Err(err.into());
        }
    };

    let result = RunOutput::from_outcome(outcome, output_dir.clone());
    write_results(&output_dir, &result).await?;
    output(&result, json_mode);
    Ok(())
}

async fn write_results(dir: &Path, result: &RunOutput) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    fs::write(dir.join("reports.json"), serde_json::to_vec_pretty(&result.reports)?)
        .await
        .context("Failed to write reports.json")?;
    fs::write(dir.join("injected.json"), serde_json::to_vec_pretty(&result.injected)?)
        .await
        .context("Failed to write injected.json")?;
    Ok(())
}
