//! Structural descriptors produced by the scanner.

use std::collections::BTreeMap;

use crate::osgi::Version;

use super::artifact::ArtifactId;
use super::capability::{Capability, PackageExport, PackageImport, Requirement};

/// Resolved view of a single artifact (a bundle or the framework)
#[derive(Debug, Clone, PartialEq)]
pub struct BundleDescriptor {
    pub artifact: ArtifactId,
    /// Start order from the feature; 0 when unspecified
    pub start_order: u32,
    pub symbolic_name: Option<String>,
    pub bundle_version: Option<Version>,
    pub manifest_version: Option<String>,
    pub exported_packages: Vec<PackageExport>,
    pub imported_packages: Vec<PackageImport>,
    pub requirements: Vec<Requirement>,
    pub capabilities: Vec<Capability>,
    /// Raw main-section manifest headers
    pub manifest: BTreeMap<String, String>,
}

impl BundleDescriptor {
    pub fn new(artifact: ArtifactId) -> Self {
        Self {
            artifact,
            start_order: 0,
            symbolic_name: None,
            bundle_version: None,
            manifest_version: None,
            exported_packages: Vec::new(),
            imported_packages: Vec::new(),
            requirements: Vec::new(),
            capabilities: Vec::new(),
            manifest: BTreeMap::new(),
        }
    }

    pub fn is_bundle(&self) -> bool {
        self.symbolic_name.is_some()
    }

    /// Raw manifest header; names compare without regard to ASCII case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.manifest
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn exports(&self, package: &str) -> impl Iterator<Item = &PackageExport> {
        self.exported_packages
            .iter()
            .filter(move |export| export.name == package)
    }
}

/// Resolved view of a feature and all of its bundles
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDescriptor {
    pub feature: ArtifactId,
    /// One descriptor per feature bundle, in feature order
    pub bundles: Vec<BundleDescriptor>,
    pub requirements: Vec<Requirement>,
    pub capabilities: Vec<Capability>,
}

impl FeatureDescriptor {
    pub fn new(feature: ArtifactId) -> Self {
        Self {
            feature,
            bundles: Vec::new(),
            requirements: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    pub fn bundle(&self, artifact: &ArtifactId) -> Option<&BundleDescriptor> {
        self.bundles
            .iter()
            .find(|b| &b.artifact == artifact)
    }
}
