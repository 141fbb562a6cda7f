use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use minijinja::{Environment, context, path_loader};
use tokio::fs;
use tracing::{debug, info};

use crate::slugify;

use super::{AnalysisReport, ReportFormat, ReportWriter};

/// Template name looked up in a template directory
pub const REPORT_TEMPLATE: &str = "report.md";

const BUNDLED_REPORT_TEMPLATE: &str = include_str!("../../templates/report.md");

/// Writes one report file per feature into a directory
#[derive(Debug, Clone)]
pub struct FileReportWriter {
    dir: PathBuf,
    format: ReportFormat,
    template_dir: Option<PathBuf>,
}

impl FileReportWriter {
    pub fn new(dir: PathBuf, format: ReportFormat) -> Self {
        Self {
            dir,
            format,
            template_dir: None,
        }
    }

    /// Prefer `report.md` from this directory over the bundled template
    pub fn with_template_dir(mut self, template_dir: Option<PathBuf>) -> Self {
        self.template_dir = template_dir;
        self
    }

    /// `<slug of feature id>-analysis.<ext>`
    pub fn file_name(&self, report: &AnalysisReport) -> String {
        format!(
            "{}-analysis.{}",
            slugify(&report.feature.to_string()),
            self.format.extension()
        )
    }

    pub fn render_markdown(&self, report: &AnalysisReport) -> Result<String> {
        let mut env = Environment::new();
        match &self.template_dir {
            Some(dir) if dir.join(REPORT_TEMPLATE).is_file() => {
                debug!("Using report template from {:?}", dir);
                env.set_loader(path_loader(dir.clone()));
            }
            _ => env
                .add_template(REPORT_TEMPLATE, BUNDLED_REPORT_TEMPLATE)
                .context("Bundled report template is invalid")?,
        }

        env.get_template(REPORT_TEMPLATE)
            .and_then(|template| template.render(context! { report => report }))
            .context("Failed to render report template")
    }

    fn render(&self, report: &AnalysisReport) -> Result<String> {
        match self.format {
            ReportFormat::Markdown => self.render_markdown(report),
            ReportFormat::Json => {
                serde_json::to_string_pretty(report).context("Failed to serialize report")
            }
        }
    }
}

#[async_trait]
impl ReportWriter for FileReportWriter {
    async fn write_report(&self, report: &AnalysisReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create report directory")?;

        let path = self.dir.join(self.file_name(report));
        fs::write(&path, self.render(report)?)
            .await
            .with_context(|| format!("Failed to write report {:?}", path))?;

        info!("Wrote {:?}", path);
        Ok(path)
    }
}
