//! Inference engine services.

pub mod annotator;
pub mod conflict_graph;
pub mod diagnostic_store;
pub mod downstream_impact;
pub mod explorer;
pub mod force_resolver;
pub mod injection;
pub mod preprocessor;
pub mod report_cache;
pub mod run_log;

pub use annotator::{AnnotationOutcome, Annotator, Phase};
pub use conflict_graph::{ConflictGraph, ConflictNode};
pub use diagnostic_store::{DiagnosticDelta, DiagnosticStore};
pub use downstream_impact::{DownstreamDiagnostic, DownstreamImpactAnalyzer, MemberImpact};
pub use explorer::{Explorer, ExplorerSettings};
pub use force_resolver::ForceResolver;
pub use preprocessor::InitializerPreprocessor;
pub use report_cache::ReportCache;
pub use run_log::RunLog;
