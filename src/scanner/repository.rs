//! Scanner over local Maven-layout repositories.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::models::{
    ArtifactId, BundleDescriptor, Capability, Feature, FeatureDescriptor, PackageExport,
};
use crate::osgi::parse_header;

use super::manifest::{self, MANIFEST_PATH};
use super::{ScanError, Scanner};

/// Framework properties listing packages the framework exports
pub const SYSTEM_PACKAGES: [&str; 2] = [
    "org.osgi.framework.system.packages",
    "org.osgi.framework.system.packages.extra",
];

/// Framework properties listing capabilities the framework provides
pub const SYSTEM_CAPABILITIES: [&str; 2] = [
    "org.osgi.framework.system.capabilities",
    "org.osgi.framework.system.capabilities.extra",
];

/// Resolves artifacts against one or more repository roots, first hit wins
#[derive(Debug, Clone)]
pub struct RepositoryScanner {
    roots: Vec<PathBuf>,
}

impl RepositoryScanner {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Find the artifact file in the first repository that contains it
    pub async fn locate(&self, id: &ArtifactId) -> Result<PathBuf, ScanError> {
        let relative = id.repository_path();
        for root in &self.roots {
            let candidate = root.join(&relative);
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Ok(candidate);
            }
        }
        Err(ScanError::ArtifactNotFound {
            id: id.clone(),
            roots: self.roots.clone(),
        })
    }

    /// Describe a single artifact from its manifest
    pub async fn scan_artifact(
        &self,
        id: &ArtifactId,
        start_order: u32,
    ) -> Result<BundleDescriptor, ScanError> {
        let path = self.locate(id).await?;
        debug!("Scanning {} from {}", id, path.display());

        let bytes = tokio::fs::read(&path).await.map_err(|source| ScanError::Io {
            path: path.clone(),
            source,
        })?;
        let headers = match read_manifest(bytes, &path)? {
            Some(raw) => manifest::parse_manifest(&raw).map_err(|message| {
                ScanError::Manifest {
                    artifact: id.clone(),
                    message,
                }
            })?,
            None => BTreeMap::new(),
        };

        let mut descriptor = manifest::describe(id.clone(), headers)?;
        descriptor.start_order = start_order;
        Ok(descriptor)
    }
}

/// Extract the raw manifest from a jar, `None` if the jar has no manifest
fn read_manifest(bytes: Vec<u8>, path: &Path) -> Result<Option<Vec<u8>>, ScanError> {
    let archive_error = |source| ScanError::Archive {
        path: path.to_path_buf(),
        source,
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(archive_error)?;
    let mut entry = match archive.by_name(MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(archive_error(e)),
    };

    let mut raw = Vec::new();
    entry
        .read_to_end(&mut raw)
        .map_err(|source| ScanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(raw))
}

/// Add the packages and capabilities declared through framework properties
fn apply_system_properties(
    descriptor: &mut BundleDescriptor,
    properties: &BTreeMap<String, String>,
) -> Result<(), ScanError> {
    let invalid = |key: &str, message: String| ScanError::Manifest {
        artifact: descriptor.artifact.clone(),
        message: format!("framework property {key}: {message}"),
    };

    let mut exports = Vec::new();
    let mut capabilities = Vec::new();
    for key in SYSTEM_PACKAGES {
        if let Some(value) = properties.get(key) {
            let clauses = parse_header(value).map_err(|e| invalid(key, e.to_string()))?;
            exports.extend(
                PackageExport::from_clauses(&clauses).map_err(|e| invalid(key, e.to_string()))?,
            );
        }
    }
    for key in SYSTEM_CAPABILITIES {
        if let Some(value) = properties.get(key) {
            let clauses = parse_header(value).map_err(|e| invalid(key, e.to_string()))?;
            capabilities.extend(clauses.iter().flat_map(Capability::from_clause));
        }
    }

    descriptor.exported_packages.extend(exports);
    descriptor.capabilities.extend(capabilities);
    Ok(())
}

#[async_trait]
impl Scanner for RepositoryScanner {
    async fn scan_feature(&self, feature: &Feature) -> Result<FeatureDescriptor, ScanError> {
        let mut descriptor = FeatureDescriptor::new(feature.id.clone());
        for bundle in &feature.bundles {
            let scanned = self.scan_artifact(&bundle.id, bundle.start_order).await?;
            descriptor.bundles.push(scanned);
        }
        descriptor.requirements = feature.requirements.clone();
        descriptor.capabilities = feature.capabilities.clone();

        debug!(
            "Scanned feature {} ({} bundles)",
            feature.id,
            descriptor.bundles.len()
        );
        Ok(descriptor)
    }

    async fn scan_framework(
        &self,
        framework: &ArtifactId,
        properties: &BTreeMap<String, String>,
    ) -> Result<BundleDescriptor, ScanError> {
        let mut descriptor = self.scan_artifact(framework, 0).await?;
        apply_system_properties(&mut descriptor, properties)?;
        Ok(descriptor)
    }
}
