use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use anyhow::Result;

use crate::analyser::{AnalyserTask, TaskContext};

/// Checks that every artifact is a well-formed bundle and that no bundle
/// appears twice with the same symbolic name and version
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleManifestCheck;

impl BundleManifestCheck {
    pub const ID: &'static str = "bundle-manifest";
    pub const NAME: &'static str = "Bundle Manifest Check";
}

impl AnalyserTask for BundleManifestCheck {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let mut seen = BTreeMap::new();

        for bundle in &ctx.descriptor().bundles {
            let Some(symbolic_name) = &bundle.symbolic_name else {
                ctx.report_error(format!(
                    "Artifact {} is not a bundle: its manifest has no Bundle-SymbolicName",
                    bundle.artifact
                ));
                continue;
            };

            match bundle.manifest_version.as_deref().map(str::trim) {
                Some("2") => {}
                Some(other) => ctx.report_warning(format!(
                    "Bundle {} declares Bundle-ManifestVersion {}, expected 2",
                    bundle.artifact, other
                )),
                None => ctx.report_warning(format!(
                    "Bundle {} has no Bundle-ManifestVersion, it is treated as an R3 bundle",
                    bundle.artifact
                )),
            }

            if bundle.bundle_version.is_none() {
                ctx.report_warning(format!(
                    "Bundle {} has no Bundle-Version, 0.0.0 is assumed",
                    bundle.artifact
                ));
            }

            let version = bundle.bundle_version.clone().unwrap_or_default();
            match seen.entry((symbolic_name.as_str(), version)) {
                Entry::Occupied(first) => {
                    let ((name, version), first) = (first.key(), first.get());
                    ctx.report_error(format!(
                        "Bundles {} and {} both provide {} {}",
                        first, bundle.artifact, name, version
                    ));
                }
                Entry::Vacant(slot) => {
                    slot.insert(&bundle.artifact);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactId, BundleDescriptor};
    use crate::tasks::testing::{bundle, run};

    #[test]
    fn test_well_formed_bundles_pass() {
        let result = run(
            &BundleManifestCheck,
            vec![
                bundle("org.example:a:1.0.0", "org.example.a"),
                bundle("org.example:b:1.0.0", "org.example.b"),
            ],
            None,
            None,
        );
        assert!(result.warnings.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_plain_jar_is_an_error() {
        let plain = BundleDescriptor::new(ArtifactId::parse("org.example:plain:1.0").unwrap());
        let result = run(&BundleManifestCheck, vec![plain], None, None);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("org.example:plain:1.0"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_manifest_warnings() {
        let mut legacy = bundle("org.example:legacy:1.0", "org.example.legacy");
        legacy.manifest_version = None;
        legacy.bundle_version = None;

        let result = run(&BundleManifestCheck, vec![legacy], None, None);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("Bundle-ManifestVersion"));
        assert!(result.warnings[1].contains("Bundle-Version"));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_duplicate_bundles() {
        let result = run(
            &BundleManifestCheck,
            vec![
                bundle("org.example:a:1.0.0", "org.example.a"),
                bundle("org.example:a-copy:1.0.0", "org.example.a"),
                bundle("org.example:a:2.0.0", "org.example.a"),
            ],
            None,
            None,
        );
        assert_eq!(
            result.errors,
            vec![
                "Bundles org.example:a:1.0.0 and org.example:a-copy:1.0.0 both provide org.example.a 1.0.0"
            ]
        );
    }
}
