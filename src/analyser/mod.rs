//! Orchestration of analysis tasks over a scanned feature.
//!
//! The [`Analyser`] scans the feature (and the framework, when one is given),
//! runs every task in order against a single [`TaskContext`], emits the
//! collected diagnostics through a [`Reporter`] and turns reported errors
//! into a run failure.

mod context;
mod reporter;
mod task;

pub use context::TaskContext;
pub use reporter::{Reporter, TracingReporter};
pub use task::AnalyserTask;

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{ArtifactId, Feature};
use crate::scanner::{ScanError, Scanner};
use crate::tasks::{ResolutionError, TaskRegistry};

/// Diagnostics collected by a run, in the order tasks reported them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyserResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl AnalyserResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum AnalyserError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("scanning failed: {0}")]
    Scan(#[from] ScanError),

    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Analyser detected errors on feature '{feature}'. See log output for error messages.")]
    ErrorsDetected {
        feature: ArtifactId,
        result: AnalyserResult,
    },
}

impl AnalyserError {
    /// Diagnostics of a run that failed because tasks reported errors
    pub fn result(&self) -> Option<&AnalyserResult> {
        match self {
            AnalyserError::ErrorsDetected { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Runs an ordered set of tasks against features
pub struct Analyser<S, R = TracingReporter>
where
    S: Scanner,
    R: Reporter,
{
    scanner: S,
    tasks: Vec<Box<dyn AnalyserTask>>,
    reporter: R,
    task_configuration: BTreeMap<String, BTreeMap<String, String>>,
}

impl<S: Scanner> Analyser<S> {
    /// Use exactly the given tasks, in the given order
    pub fn new(scanner: S, tasks: Vec<Box<dyn AnalyserTask>>) -> Self {
        Self {
            scanner,
            tasks,
            reporter: TracingReporter,
            task_configuration: BTreeMap::new(),
        }
    }

    /// Select tasks by id, in request order
    pub fn from_ids<T: AsRef<str>>(
        scanner: S,
        registry: &TaskRegistry,
        ids: &[T],
    ) -> Result<Self, AnalyserError> {
        Ok(Self::new(scanner, registry.by_ids(ids)?))
    }

    /// Select tasks by human readable name, in request order
    pub fn from_names<T: AsRef<str>>(
        scanner: S,
        registry: &TaskRegistry,
        names: &[T],
    ) -> Result<Self, AnalyserError> {
        Ok(Self::new(scanner, registry.by_names(names)?))
    }

    /// Select tasks by include/exclude lists, in registry order
    pub fn from_filter<T: AsRef<str>>(
        scanner: S,
        registry: &TaskRegistry,
        includes: &[T],
        excludes: &[T],
    ) -> Result<Self, AnalyserError> {
        Ok(Self::new(scanner, registry.filtered(includes, excludes)?))
    }

    pub fn with_all_tasks(scanner: S, registry: &TaskRegistry) -> Self {
        Self::new(scanner, registry.all())
    }
}

impl<S, R> Analyser<S, R>
where
    S: Scanner,
    R: Reporter,
{
    /// Replace the reporter receiving the diagnostics
    pub fn with_reporter<R2: Reporter>(self, reporter: R2) -> Analyser<S, R2> {
        Analyser {
            scanner: self.scanner,
            tasks: self.tasks,
            reporter,
            task_configuration: self.task_configuration,
        }
    }

    /// Set per-task configuration, keyed by task id
    pub fn with_task_configuration(
        mut self,
        configuration: BTreeMap<String, BTreeMap<String, String>>,
    ) -> Self {
        self.task_configuration = configuration;
        self
    }

    pub fn tasks(&self) -> &[Box<dyn AnalyserTask>] {
        &self.tasks
    }

    /// Analyse a feature, optionally against a framework.
    ///
    /// Succeeds when no task reported an error. Warnings never fail a run.
    pub async fn analyse(
        &self,
        feature: &Feature,
        framework: Option<&ArtifactId>,
    ) -> Result<AnalyserResult, AnalyserError> {
        info!("Starting analyzing feature '{}'...", feature.id);

        let descriptor = self.scanner.scan_feature(feature).await?;
        let framework_descriptor = match framework {
            Some(id) => {
                debug!("Scanning framework {}", id);
                Some(
                    self.scanner
                        .scan_framework(id, feature.framework_properties())
                        .await?,
                )
            }
            None => None,
        };

        let mut ctx = TaskContext::new(feature, &descriptor, framework_descriptor.as_ref());
        for task in &self.tasks {
            info!("- Executing {} [{}]...", task.name(), task.id());
            ctx.set_configuration(self.task_configuration.get(task.id()));
            task.execute(&mut ctx)
                .map_err(|source| AnalyserError::TaskFailed {
                    task: task.id().to_string(),
                    source,
                })?;
        }
        let result = ctx.into_result();

        for warning in &result.warnings {
            self.reporter.warning(warning);
        }
        for error in &result.errors {
            self.reporter.error(error);
        }

        if result.is_success() {
            info!(
                "Analyser detected no errors on feature '{}' ({} warnings).",
                feature.id,
                result.warnings.len()
            );
            Ok(result)
        } else {
            Err(AnalyserError::ErrorsDetected {
                feature: feature.id.clone(),
                result,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BundleDescriptor, FeatureBundle, FeatureDescriptor};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockScanner {
        feature_scans: AtomicUsize,
        framework_scans: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Scanner for Arc<MockScanner> {
        async fn scan_feature(&self, feature: &Feature) -> Result<FeatureDescriptor, ScanError> {
            self.feature_scans.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScanError::Manifest {
                    artifact: feature.id.clone(),
                    message: "broken".to_string(),
                });
            }
            let mut descriptor = FeatureDescriptor::new(feature.id.clone());
            descriptor.bundles = feature
                .bundles
                .iter()
                .map(|b| BundleDescriptor::new(b.id.clone()))
                .collect();
            Ok(descriptor)
        }

        async fn scan_framework(
            &self,
            framework: &ArtifactId,
            _properties: &BTreeMap<String, String>,
        ) -> Result<BundleDescriptor, ScanError> {
            self.framework_scans.fetch_add(1, Ordering::SeqCst);
            Ok(BundleDescriptor::new(framework.clone()))
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        emitted: Mutex<Vec<String>>,
    }

    impl Reporter for RecordingReporter {
        fn warning(&self, message: &str) {
            self.emitted.lock().unwrap().push(format!("WARN {message}"));
        }

        fn error(&self, message: &str) {
            self.emitted.lock().unwrap().push(format!("ERROR {message}"));
        }
    }

    type Journal = Arc<Mutex<Vec<String>>>;

    struct ScriptedTask {
        id: &'static str,
        warnings: Vec<&'static str>,
        errors: Vec<&'static str>,
        fail: bool,
        journal: Journal,
    }

    impl ScriptedTask {
        fn new(id: &'static str, journal: &Journal) -> Self {
            Self {
                id,
                warnings: Vec::new(),
                errors: Vec::new(),
                fail: false,
                journal: journal.clone(),
            }
        }

        fn warns(mut self, message: &'static str) -> Self {
            self.warnings.push(message);
            self
        }

        fn errors(mut self, message: &'static str) -> Self {
            self.errors.push(message);
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn boxed(self) -> Box<dyn AnalyserTask> {
            Box::new(self)
        }
    }

    impl AnalyserTask for ScriptedTask {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        fn execute(&self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
            self.journal.lock().unwrap().push(format!(
                "{} framework={} bundles={} config={:?}",
                self.id,
                ctx.framework().is_some(),
                ctx.descriptor().bundles.len(),
                ctx.config_value("key"),
            ));
            if self.fail {
                anyhow::bail!("{} blew up", self.id);
            }
            for w in &self.warnings {
                ctx.report_warning(*w);
            }
            for e in &self.errors {
                ctx.report_error(*e);
            }
            Ok(())
        }
    }

    fn feature() -> Feature {
        Feature::new(ArtifactId::parse("g:feature:1.0").unwrap())
            .with_bundle(FeatureBundle::new(ArtifactId::parse("g:a:1.0").unwrap()))
    }

    #[tokio::test]
    async fn test_warnings_alone_succeed() {
        let journal = Journal::default();
        let reporter = Arc::new(RecordingReporter::default());
        let analyser = Analyser::new(
            Arc::new(MockScanner::default()),
            vec![
                ScriptedTask::new("a", &journal).warns("w1").boxed(),
                ScriptedTask::new("b", &journal).warns("w2").boxed(),
            ],
        )
        .with_reporter(reporter.clone());

        let result = analyser.analyse(&feature(), None).await.unwrap();
        assert_eq!(result.warnings, vec!["w1", "w2"]);
        assert!(result.errors.is_empty());
        assert_eq!(
            *reporter.emitted.lock().unwrap(),
            vec!["WARN w1", "WARN w2"]
        );
    }

    #[tokio::test]
    async fn test_single_error_fails_run() {
        let journal = Journal::default();
        let analyser = Analyser::new(
            Arc::new(MockScanner::default()),
            vec![
                ScriptedTask::new("c1", &journal).errors("missing cap X").boxed(),
                ScriptedTask::new("c2", &journal).boxed(),
            ],
        );

        let err = analyser.analyse(&feature(), None).await.unwrap_err();
        match err {
            AnalyserError::ErrorsDetected { feature, result } => {
                assert_eq!(feature.to_string(), "g:feature:1.0");
                assert_eq!(result.errors, vec!["missing cap X"]);
                assert!(result.warnings.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(journal.lock().unwrap().len(), 2, "every task runs");
    }

    #[tokio::test]
    async fn test_aggregate_message_does_not_embed_diagnostics() {
        let journal = Journal::default();
        let analyser = Analyser::new(
            Arc::new(MockScanner::default()),
            vec![ScriptedTask::new("c1", &journal).errors("secret detail").boxed()],
        );

        let err = analyser.analyse(&feature(), None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Analyser detected errors on feature 'g:feature:1.0'. See log output for error messages."
        );
    }

    #[tokio::test]
    async fn test_warnings_emitted_before_errors() {
        let journal = Journal::default();
        let reporter = Arc::new(RecordingReporter::default());
        let analyser = Analyser::new(
            Arc::new(MockScanner::default()),
            vec![
                ScriptedTask::new("a", &journal).errors("e1").warns("w1").boxed(),
                ScriptedTask::new("b", &journal).warns("w2").errors("e2").boxed(),
            ],
        )
        .with_reporter(reporter.clone());

        assert!(analyser.analyse(&feature(), None).await.is_err());
        assert_eq!(
            *reporter.emitted.lock().unwrap(),
            vec!["WARN w1", "WARN w2", "ERROR e1", "ERROR e2"]
        );
    }

    #[tokio::test]
    async fn test_fatal_failure_short_circuits() {
        let journal = Journal::default();
        let reporter = Arc::new(RecordingReporter::default());
        let analyser = Analyser::new(
            Arc::new(MockScanner::default()),
            vec![
                ScriptedTask::new("a", &journal).warns("w1").boxed(),
                ScriptedTask::new("b", &journal).failing().boxed(),
                ScriptedTask::new("c", &journal).boxed(),
            ],
        )
        .with_reporter(reporter.clone());

        let err = analyser.analyse(&feature(), None).await.unwrap_err();
        assert!(matches!(&err, AnalyserError::TaskFailed { task, .. } if task == "b"));
        assert_eq!(journal.lock().unwrap().len(), 2);
        assert!(reporter.emitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_framework_absent_without_id() {
        let journal = Journal::default();
        let scanner = Arc::new(MockScanner::default());
        let analyser = Analyser::new(
            scanner.clone(),
            vec![
                ScriptedTask::new("a", &journal).boxed(),
                ScriptedTask::new("b", &journal).boxed(),
            ],
        );

        analyser.analyse(&feature(), None).await.unwrap();
        assert_eq!(scanner.framework_scans.load(Ordering::SeqCst), 0);
        assert!(
            journal
                .lock()
                .unwrap()
                .iter()
                .all(|entry| entry.contains("framework=false"))
        );

        let framework = ArtifactId::parse("org.apache.felix:framework:7.0").unwrap();
        analyser.analyse(&feature(), Some(&framework)).await.unwrap();
        assert_eq!(scanner.framework_scans.load(Ordering::SeqCst), 1);
        assert!(journal.lock().unwrap()[2].contains("framework=true"));
    }

    #[tokio::test]
    async fn test_scan_failure_runs_nothing() {
        let journal = Journal::default();
        let reporter = Arc::new(RecordingReporter::default());
        let scanner = Arc::new(MockScanner {
            fail: true,
            ..Default::default()
        });
        let analyser = Analyser::new(
            scanner.clone(),
            vec![ScriptedTask::new("a", &journal).warns("w").boxed()],
        )
        .with_reporter(reporter.clone());

        let framework = ArtifactId::parse("org.apache.felix:framework:7.0").unwrap();
        let err = analyser
            .analyse(&feature(), Some(&framework))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyserError::Scan(_)));
        assert!(journal.lock().unwrap().is_empty());
        assert!(reporter.emitted.lock().unwrap().is_empty());
        assert_eq!(scanner.framework_scans.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_task_configuration_is_per_task() {
        let journal = Journal::default();
        let mut configuration = BTreeMap::new();
        configuration.insert(
            "b".to_string(),
            BTreeMap::from([("key".to_string(), "value".to_string())]),
        );
        let analyser = Analyser::new(
            Arc::new(MockScanner::default()),
            vec![
                ScriptedTask::new("a", &journal).boxed(),
                ScriptedTask::new("b", &journal).boxed(),
            ],
        )
        .with_task_configuration(configuration);

        analyser.analyse(&feature(), None).await.unwrap();
        let journal = journal.lock().unwrap();
        assert!(journal[0].ends_with("config=None"));
        assert!(journal[1].ends_with("config=Some(\"value\")"));
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let journal = Journal::default();
        let analyser = Analyser::new(
            Arc::new(MockScanner::default()),
            vec![ScriptedTask::new("a", &journal).warns("w").boxed()],
        );

        let first = analyser.analyse(&feature(), None).await.unwrap();
        let second = analyser.analyse(&feature(), None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.warnings, vec!["w"]);
    }

    #[tokio::test]
    async fn test_empty_task_list_still_scans() {
        let scanner = Arc::new(MockScanner::default());
        let reporter = Arc::new(RecordingReporter::default());
        let analyser = Analyser::new(scanner.clone(), Vec::new()).with_reporter(reporter.clone());
        assert!(analyser.tasks().is_empty());

        let result = analyser.analyse(&feature(), None).await.unwrap();
        assert!(result.is_success());
        assert!(result.warnings.is_empty());
        assert!(result.errors.is_empty());
        assert_eq!(scanner.feature_scans.load(Ordering::SeqCst), 1);
        assert_eq!(scanner.framework_scans.load(Ordering::SeqCst), 0);
        assert!(reporter.emitted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_task_fails_construction() {
        let registry = TaskRegistry::default();
        let scanner = Arc::new(MockScanner::default());

        let err = Analyser::from_ids(scanner.clone(), &registry, &["bundle-manifest", "nope"])
            .err()
            .unwrap();
        match err {
            AnalyserError::Resolution(resolution) => {
                assert_eq!(resolution.missing, vec!["nope"]);
                assert_eq!(resolution.requested.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(Analyser::from_names(scanner.clone(), &registry, &["Nope Check"]).is_err());

        let analyser = Analyser::from_ids(
            scanner,
            &registry,
            &["requirements-capabilities", "bundle-manifest"],
        )
        .unwrap();
        let ids: Vec<&str> = analyser.tasks().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["requirements-capabilities", "bundle-manifest"]);
    }
}
