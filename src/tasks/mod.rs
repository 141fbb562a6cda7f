//! Built-in analysis tasks and the registry used to select them.
//!
//! - `bundle_manifest`: manifest sanity and duplicate bundles
//! - `bundle_packages`: package imports resolve against exports
//! - `requirements_capabilities`: generic requirements resolve against capabilities

mod bundle_manifest;
mod bundle_packages;
mod requirements_capabilities;

pub use bundle_manifest::BundleManifestCheck;
pub use bundle_packages::{BundlePackagesCheck, IGNORED_PACKAGES};
pub use requirements_capabilities::RequirementsCapabilitiesCheck;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::analyser::AnalyserTask;

/// Creates a fresh task instance
pub type TaskFactory = fn() -> Box<dyn AnalyserTask>;

/// Requested tasks that could not be found
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unable to resolve analyser tasks {missing:?} (requested {requested:?})")]
pub struct ResolutionError {
    pub requested: Vec<String>,
    pub missing: Vec<String>,
}

/// Id and name of a registered task, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescription {
    pub id: String,
    pub name: String,
}

/// Known tasks in registration order
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    factories: Vec<TaskFactory>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(|| Box::new(BundleManifestCheck))
            .register(|| Box::new(BundlePackagesCheck))
            .register(|| Box::new(RequirementsCapabilitiesCheck));
        registry
    }
}

impl TaskRegistry {
    /// A registry without the built-in tasks
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Append a task after every task registered so far
    pub fn register(&mut self, factory: TaskFactory) -> &mut Self {
        self.factories.push(factory);
        self
    }

    pub fn all(&self) -> Vec<Box<dyn AnalyserTask>> {
        self.factories.iter().map(|factory| factory()).collect()
    }

    pub fn descriptions(&self) -> Vec<TaskDescription> {
        self.all()
            .iter()
            .map(|task| TaskDescription {
                id: task.id().to_string(),
                name: task.name().to_string(),
            })
            .collect()
    }

    /// Tasks by id, in request order
    pub fn by_ids<T: AsRef<str>>(
        &self,
        ids: &[T],
    ) -> Result<Vec<Box<dyn AnalyserTask>>, ResolutionError> {
        self.select(ids, |task| task.id())
    }

    /// Tasks by name, in request order
    pub fn by_names<T: AsRef<str>>(
        &self,
        names: &[T],
    ) -> Result<Vec<Box<dyn AnalyserTask>>, ResolutionError> {
        self.select(names, |task| task.name())
    }

    /// Tasks in registry order, narrowed by includes and excludes.
    ///
    /// An empty include list or `*` selects every task. Explicit includes
    /// must exist; excludes always win.
    pub fn filtered<T: AsRef<str>>(
        &self,
        includes: &[T],
        excludes: &[T],
    ) -> Result<Vec<Box<dyn AnalyserTask>>, ResolutionError> {
        let includes: Vec<&str> = includes.iter().map(AsRef::as_ref).collect();
        let excludes: Vec<&str> = excludes.iter().map(AsRef::as_ref).collect();
        let tasks = self.all();

        let missing: Vec<String> = includes
            .iter()
            .filter(|id| **id != "*" && !tasks.iter().any(|task| task.id() == **id))
            .map(|id| id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ResolutionError {
                requested: includes.iter().map(|id| id.to_string()).collect(),
                missing,
            });
        }

        for id in &excludes {
            if !tasks.iter().any(|task| task.id() == *id) {
                debug!("Excluded task '{}' is not registered", id);
            }
        }

        let everything = includes.is_empty() || includes.contains(&"*");
        Ok(tasks
            .into_iter()
            .filter(|task| everything || includes.iter().any(|id| *id == task.id()))
            .filter(|task| !excludes.iter().any(|id| *id == task.id()))
            .collect())
    }

    fn select<T, F>(
        &self,
        requested: &[T],
        key: F,
    ) -> Result<Vec<Box<dyn AnalyserTask>>, ResolutionError>
    where
        T: AsRef<str>,
        F: Fn(&dyn AnalyserTask) -> &str,
    {
        let mut selected = Vec::with_capacity(requested.len());
        let mut missing = Vec::new();

        for wanted in requested.iter().map(AsRef::as_ref) {
            match self
                .factories
                .iter()
                .map(|factory| factory())
                .find(|task| key(task.as_ref()) == wanted)
            {
                Some(task) => selected.push(task),
                None => missing.push(wanted.to_string()),
            }
        }

        if missing.is_empty() {
            Ok(selected)
        } else {
            Err(ResolutionError {
                requested: requested.iter().map(|r| r.as_ref().to_string()).collect(),
                missing,
            })
        }
    }
}
