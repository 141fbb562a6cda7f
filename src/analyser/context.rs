use std::collections::BTreeMap;

use crate::models::{BundleDescriptor, Feature, FeatureDescriptor};

use super::AnalyserResult;

static EMPTY_CONFIGURATION: BTreeMap<String, String> = BTreeMap::new();

/// Per-run view handed to every task: the inputs plus append-only
/// diagnostic sinks
#[derive(Debug)]
pub struct TaskContext<'a> {
    feature: &'a Feature,
    descriptor: &'a FeatureDescriptor,
    framework: Option<&'a BundleDescriptor>,
    configuration: &'a BTreeMap<String, String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        feature: &'a Feature,
        descriptor: &'a FeatureDescriptor,
        framework: Option<&'a BundleDescriptor>,
    ) -> Self {
        Self {
            feature,
            descriptor,
            framework,
            configuration: &EMPTY_CONFIGURATION,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Point the context at the configuration of the task about to run
    pub(crate) fn set_configuration(&mut self, configuration: Option<&'a BTreeMap<String, String>>) {
        self.configuration = configuration.unwrap_or(&EMPTY_CONFIGURATION);
    }

    pub(crate) fn into_result(self) -> AnalyserResult {
        AnalyserResult {
            warnings: self.warnings,
            errors: self.errors,
        }
    }

    pub fn feature(&self) -> &'a Feature {
        self.feature
    }

    pub fn descriptor(&self) -> &'a FeatureDescriptor {
        self.descriptor
    }

    /// `None` when the run was started without a framework
    pub fn framework(&self) -> Option<&'a BundleDescriptor> {
        self.framework
    }

    pub fn configuration(&self) -> &'a BTreeMap<String, String> {
        self.configuration
    }

    pub fn config_value(&self, key: &str) -> Option<&'a str> {
        self.configuration.get(key).map(String::as_str)
    }

    pub fn report_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}
