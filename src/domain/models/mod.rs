pub mod analysis_mode;
pub mod change;
pub mod config;
pub mod diagnostic;
pub mod location;
pub mod report;

pub use analysis_mode::AnalysisMode;
pub use change::{Change, InjectedChange, InjectionPhase};
pub use config::{
    AnnotationConfig, CheckerConfig, Config, ExecutionConfig, ExplorationStrategy,
    InferenceConfig, InjectorConfig, LoggingConfig, RegistryConfig,
};
pub use diagnostic::{kinds, CandidateFix, Diagnostic, FixOrigin, DOWNSTREAM_REASON};
pub use location::{DeclLocation, Region, RegionKind};
pub use report::{Report, Tag};
