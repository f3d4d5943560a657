use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::analysis_mode::AnalysisMode;

/// Main configuration structure for Nullsweep
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Name of the module under inference
    #[serde(default = "default_target_module")]
    pub target_module: String,

    /// Modules that consume the target and are never modified
    #[serde(default)]
    pub downstream_modules: Vec<String>,

    /// Directory for run artifacts (reports, injection log)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Inference engine settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Annotation names written into source
    #[serde(default)]
    pub annotations: AnnotationConfig,

    /// Build parallelism
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// External checker invocation
    #[serde(default)]
    pub checker: CheckerConfig,

    /// External injector invocation
    #[serde(default)]
    pub injector: InjectorConfig,

    /// Declaration index location
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_target_module() -> String {
    "main".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".nullsweep/out")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_module: default_target_module(),
            downstream_modules: vec![],
            output_dir: default_output_dir(),
            inference: InferenceConfig::default(),
            annotations: AnnotationConfig::default(),
            execution: ExecutionConfig::default(),
            checker: CheckerConfig::default(),
            injector: InjectorConfig::default(),
            registry: RegistryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Analysis mode after accounting for whether downstream analysis runs.
    pub const fn effective_mode(&self) -> AnalysisMode {
        self.inference
            .mode
            .effective(self.inference.downstream_analysis)
    }
}

/// How candidate trees are measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationStrategy {
    /// Rebuild for every tree
    #[default]
    Basic,
    /// Reuse measurements of identical trees until the target changes
    Cached,
    /// No measurement, every candidate is approved
    Exhaustive,
}

/// Inference engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InferenceConfig {
    /// Run the inference rounds at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum fix tree depth
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Stop growing a tree once its effect is not an improvement
    #[serde(default = "default_true")]
    pub bailout: bool,

    /// Inject whole approved trees instead of just their roots
    #[serde(default)]
    pub chain: bool,

    /// Skip roots already evaluated in earlier rounds
    #[serde(default = "default_true")]
    pub cache: bool,

    /// Repeat rounds until no new reports appear
    #[serde(default = "default_true")]
    pub outer_loop: bool,

    #[serde(default)]
    pub strategy: ExplorationStrategy,

    /// Decision policy (ignored unless downstream analysis is on)
    #[serde(default)]
    pub mode: AnalysisMode,

    /// Estimate effects on downstream modules
    #[serde(default)]
    pub downstream_analysis: bool,

    /// Suppress whatever remains after inference
    #[serde(default)]
    pub force_resolve: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_depth() -> usize {
    5
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            depth: default_depth(),
            bailout: true,
            chain: false,
            cache: true,
            outer_loop: true,
            strategy: ExplorationStrategy::default(),
            mode: AnalysisMode::default(),
            downstream_analysis: false,
            force_resolve: false,
        }
    }
}

/// Annotation names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AnnotationConfig {
    #[serde(default = "default_nullable")]
    pub nullable: String,

    /// Marks initializer methods; preprocessing is skipped when unset
    #[serde(default)]
    pub initializer: Option<String>,

    #[serde(default = "default_null_unmarked")]
    pub null_unmarked: String,

    #[serde(default = "default_suppress_warnings")]
    pub suppress_warnings: String,

    #[serde(default = "default_suppression_key")]
    pub suppression_key: String,

    #[serde(default = "default_init_suppression_key")]
    pub init_suppression_key: String,
}

fn default_nullable() -> String {
    "javax.annotation.Nullable".to_string()
}

fn default_null_unmarked() -> String {
    "org.jspecify.annotations.NullUnmarked".to_string()
}

fn default_suppress_warnings() -> String {
    "SuppressWarnings".to_string()
}

fn default_suppression_key() -> String {
    "NullAway".to_string()
}

fn default_init_suppression_key() -> String {
    "NullAway.Init".to_string()
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            nullable: default_nullable(),
            initializer: None,
            null_unmarked: default_null_unmarked(),
            suppress_warnings: default_suppress_warnings(),
            suppression_key: default_suppression_key(),
            init_suppression_key: default_init_suppression_key(),
        }
    }
}

/// Build parallelism
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionConfig {
    /// Evaluate independent trees in shared builds
    #[serde(default = "default_true")]
    pub parallel_processing: bool,

    /// Upper limit of trees measured by one build
    #[serde(default = "default_max_group_size")]
    pub max_group_size: usize,

    /// Concurrent downstream builds
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

const fn default_max_group_size() -> usize {
    16
}

const fn default_max_workers() -> usize {
    4
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            parallel_processing: true,
            max_group_size: default_max_group_size(),
            max_workers: default_max_workers(),
        }
    }
}

/// External checker invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckerConfig {
    /// Shell command that builds the requested modules
    #[serde(default)]
    pub build_command: String,

    /// Where the checker writes `<module>/diagnostics.json`; defaults to `output_dir`
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// External injector invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InjectorConfig {
    #[serde(default)]
    pub command: String,
}

/// Declaration index location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistryConfig {
    #[serde(default = "default_declarations_path")]
    pub declarations_path: PathBuf,
}

fn default_declarations_path() -> PathBuf {
    PathBuf::from(".nullsweep/declarations.json")
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            declarations_path: default_declarations_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
