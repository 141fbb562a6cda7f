pub mod files;

pub use files::FileReportWriter;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analyser::{AnalyserResult, AnalyserTask};
use crate::models::ArtifactId;
use crate::tasks::TaskDescription;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Markdown => "md",
            ReportFormat::Json => "json",
        }
    }
}

/// Outcome of analysing one feature, as written to disk
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub feature: ArtifactId,
    pub framework: Option<ArtifactId>,
    pub tasks: Vec<TaskDescription>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub passed: bool,
    /// RFC 3339 timestamp
    pub generated_at: String,
}

impl AnalysisReport {
    pub fn new(
        feature: &ArtifactId,
        framework: Option<&ArtifactId>,
        tasks: &[Box<dyn AnalyserTask>],
        result: &AnalyserResult,
    ) -> Self {
        Self {
            feature: feature.clone(),
            framework: framework.cloned(),
            tasks: tasks
                .iter()
                .map(|task| TaskDescription {
                    id: task.id().to_string(),
                    name: task.name().to_string(),
                })
                .collect(),
            warnings: result.warnings.clone(),
            errors: result.errors.clone(),
            passed: result.is_success(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for persisting analysis reports
#[async_trait]
pub trait ReportWriter: Send + Sync {
    /// Write the report, returning the path it was written to
    async fn write_report(&self, report: &AnalysisReport) -> Result<PathBuf>;
}
