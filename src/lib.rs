pub mod analyser;
pub mod config;
pub mod models;
pub mod osgi;
pub mod output;
pub mod reader;
pub mod scanner;
pub mod slug;
pub mod tasks;

// Re-export main types
pub use analyser::{
    Analyser, AnalyserError, AnalyserResult, AnalyserTask, Reporter, TaskContext,
    TracingReporter,
};
pub use config::AnalyserConfig;
pub use models::{ArtifactId, BundleDescriptor, Feature, FeatureBundle, FeatureDescriptor};
pub use output::{AnalysisReport, FileReportWriter, ReportFormat, ReportWriter};
pub use reader::{FeatureError, parse_feature, read_feature};
pub use scanner::{RepositoryScanner, ScanError, Scanner};
pub use tasks::{ResolutionError, TaskRegistry};

// Re-export slug utilities
pub use slug::slugify;
