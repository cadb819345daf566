pub mod classify;
pub mod config;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod result;
pub mod scanner;
pub mod types;

pub use config::Config;
pub use error::AnalysisError;
pub use graph::{DependencyGraph, EdgePolicy};
pub use pipeline::AnalysisPipeline;
pub use registry::ComponentRegistry;
pub use result::{ComponentMetrics, MetricsResult};
pub use scanner::{ScanOutput, SourceScanner};
pub use types::*;
