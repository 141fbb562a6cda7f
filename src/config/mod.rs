mod settings;

pub use settings::{AnalyserConfig, ReportConfig, TaskConfig};
