use std::collections::BTreeMap;

use super::artifact::ArtifactId;
use super::capability::{Capability, Requirement};

/// A bundle entry of a feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureBundle {
    pub id: ArtifactId,
    /// 0 means no explicit start order
    pub start_order: u32,
}

impl FeatureBundle {
    pub fn new(id: ArtifactId) -> Self {
        Self { id, start_order: 0 }
    }

    pub fn with_start_order(mut self, start_order: u32) -> Self {
        self.start_order = start_order;
        self
    }
}

/// A declarative feature: bundles, framework properties and the feature's
/// own requirements and capabilities
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: ArtifactId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub variables: BTreeMap<String, String>,
    /// Framework launch properties, variables already substituted
    pub framework_properties: BTreeMap<String, String>,
    pub bundles: Vec<FeatureBundle>,
    pub requirements: Vec<Requirement>,
    pub capabilities: Vec<Capability>,
}

impl Feature {
    pub fn new(id: ArtifactId) -> Self {
        Self {
            id,
            title: None,
            description: None,
            variables: BTreeMap::new(),
            framework_properties: BTreeMap::new(),
            bundles: Vec::new(),
            requirements: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_bundle(mut self, bundle: FeatureBundle) -> Self {
        self.bundles.push(bundle);
        self
    }

    pub fn framework_properties(&self) -> &BTreeMap<String, String> {
        &self.framework_properties
    }
}
