use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::ArtifactId;
use crate::output::ReportFormat;

/// Main analyser configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// Local Maven-layout repositories, searched in order
    pub repositories: Vec<PathBuf>,
    /// Framework to analyse against when none is given on the command line
    pub framework: Option<ArtifactId>,
    pub tasks: TaskConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Task ids to run; `*` means every registered task
    pub includes: Vec<String>,
    /// Task ids never to run
    pub excludes: Vec<String>,
    /// Per-task string settings, keyed by task id
    pub configuration: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory for report files; no reports are written when unset
    pub dir: Option<PathBuf>,
    pub format: ReportFormat,
    /// Directory holding a `report.md` template overriding the bundled one
    pub template_dir: Option<PathBuf>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            includes: vec!["*".to_string()],
            excludes: Vec::new(),
            configuration: BTreeMap::new(),
        }
    }
}

impl AnalyserConfig {
    /// `<config dir>/feature-analyser/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("feature-analyser").join("config.yaml"))
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AnalyserConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file doesn't exist
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            _ => Ok(Self::default()),
        }
    }

    /// Repositories to search, the local Maven repository when none are configured
    pub fn repository_roots(&self) -> Vec<PathBuf> {
        if !self.repositories.is_empty() {
            return self.repositories.clone();
        }
        dirs::home_dir()
            .map(|home| vec![home.join(".m2").join("repository")])
            .unwrap_or_default()
    }
}
