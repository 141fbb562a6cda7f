use anyhow::Result;
use tracing::debug;

use crate::analyser::{AnalyserTask, TaskContext};
use crate::models::{BundleDescriptor, PackageExport, PackageImport};

/// Configuration key: comma separated packages to skip, `*` suffix for prefixes
pub const IGNORED_PACKAGES: &str = "ignored-packages";

/// Checks that every package import is exported, in range, by another bundle
/// of the feature or by the framework
#[derive(Debug, Clone, Copy, Default)]
pub struct BundlePackagesCheck;

impl BundlePackagesCheck {
    pub const ID: &'static str = "bundle-packages";
    pub const NAME: &'static str = "Bundle Import/Export Check";
}

enum Resolution<'a> {
    Satisfied,
    NoExporter,
    NotInRange(Vec<&'a PackageExport>),
    StartedLater(&'a BundleDescriptor),
}

struct Exporter<'a> {
    /// `None` for the framework
    bundle: Option<&'a BundleDescriptor>,
    export: &'a PackageExport,
}

struct IgnoredPackages<'a> {
    exact: Vec<&'a str>,
    prefixes: Vec<&'a str>,
}

impl<'a> IgnoredPackages<'a> {
    fn parse(value: Option<&'a str>) -> Self {
        let mut ignored = Self {
            exact: Vec::new(),
            prefixes: Vec::new(),
        };
        for entry in value.unwrap_or_default().split(',').map(str::trim) {
            if entry.is_empty() {
                continue;
            }
            match entry.strip_suffix('*') {
                Some(prefix) => ignored.prefixes.push(prefix),
                None => ignored.exact.push(entry),
            }
        }
        ignored
    }

    fn contains(&self, package: &str) -> bool {
        self.exact.iter().any(|exact| *exact == package)
            || self
                .prefixes
                .iter()
                .any(|prefix| package.starts_with(prefix))
    }
}

fn resolve<'a>(
    importer: &BundleDescriptor,
    import: &PackageImport,
    bundles: &'a [BundleDescriptor],
    framework: Option<&'a BundleDescriptor>,
) -> Resolution<'a> {
    let exporters: Vec<Exporter<'a>> = bundles
        .iter()
        .filter(|bundle| bundle.artifact != importer.artifact)
        .flat_map(|bundle| {
            bundle.exports(&import.name).map(move |export| Exporter {
                bundle: Some(bundle),
                export,
            })
        })
        .chain(
            framework
                .into_iter()
                .flat_map(|fw| fw.exports(&import.name))
                .map(|export| Exporter {
                    bundle: None,
                    export,
                }),
        )
        .collect();

    if exporters.is_empty() {
        return Resolution::NoExporter;
    }

    let in_range: Vec<&Exporter<'a>> = exporters
        .iter()
        .filter(|exporter| import.range.includes(&exporter.export.version))
        .collect();
    if in_range.is_empty() {
        return Resolution::NotInRange(exporters.iter().map(|e| e.export).collect());
    }

    let starts_later = |exporter: &Exporter<'a>| {
        exporter.bundle.is_some_and(|bundle| {
            importer.start_order != 0
                && bundle.start_order != 0
                && bundle.start_order > importer.start_order
        })
    };
    if in_range.iter().any(|exporter| !starts_later(exporter)) {
        return Resolution::Satisfied;
    }
    match in_range[0].bundle {
        Some(bundle) => Resolution::StartedLater(bundle),
        None => Resolution::Satisfied,
    }
}

impl AnalyserTask for BundlePackagesCheck {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let ignored = IgnoredPackages::parse(ctx.config_value(IGNORED_PACKAGES));
        let bundles = &ctx.descriptor().bundles;
        let framework = ctx.framework();

        for importer in bundles {
            for import in &importer.imported_packages {
                if import.name.starts_with("java.")
                    || importer.exports(&import.name).next().is_some()
                    || ignored.contains(&import.name)
                {
                    debug!("{}: skipping import of {}", importer.artifact, import.name);
                    continue;
                }

                let problem = match resolve(importer, import, bundles, framework) {
                    Resolution::Satisfied => continue,
                    Resolution::NoExporter => format!(
                        "Bundle {} is importing package {} with version {} but no bundle is exporting it.",
                        importer.artifact, import.name, import.range
                    ),
                    Resolution::NotInRange(found) => format!(
                        "Bundle {} is importing package {} with version {} but no bundle is exporting it in that version range (exported versions: {}).",
                        importer.artifact,
                        import.name,
                        import.range,
                        found
                            .iter()
                            .map(|export| export.version.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    Resolution::StartedLater(exporter) => format!(
                        "Bundle {} (start order {}) is importing package {} but it is exported by {} which has a later start order ({}).",
                        importer.artifact,
                        importer.start_order,
                        import.name,
                        exporter.artifact,
                        exporter.start_order
                    ),
                };

                if import.optional {
                    ctx.report_warning(format!("Optional import cannot be resolved: {problem}"));
                } else {
                    ctx.report_error(problem);
                }
            }
        }

        Ok(())
    }
}
