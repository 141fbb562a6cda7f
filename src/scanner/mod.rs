//! Scanning turns a feature and its artifacts into structural descriptors.

pub mod manifest;
pub mod repository;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ArtifactId, BundleDescriptor, Feature, FeatureDescriptor};

pub use repository::RepositoryScanner;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("artifact {id} not found in any repository")]
    ArtifactNotFound { id: ArtifactId, roots: Vec<PathBuf> },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a readable archive: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("invalid manifest in {artifact}: {message}")]
    Manifest { artifact: ArtifactId, message: String },
}

/// Trait for producing descriptors - allows mocking in tests
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Describe the feature and every bundle it contains
    async fn scan_feature(&self, feature: &Feature) -> Result<FeatureDescriptor, ScanError>;

    /// Describe the framework artifact, taking the feature's framework
    /// properties into account
    async fn scan_framework(
        &self,
        framework: &ArtifactId,
        properties: &BTreeMap<String, String>,
    ) -> Result<BundleDescriptor, ScanError>;
}
