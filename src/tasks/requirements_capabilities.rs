use anyhow::Result;
use tracing::debug;

use crate::analyser::{AnalyserTask, TaskContext};
use crate::models::{ArtifactId, Capability, Requirement};

/// Checks that every resolve-time requirement is matched by a capability
/// somewhere else in the feature or in the framework
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementsCapabilitiesCheck;

impl RequirementsCapabilitiesCheck {
    pub const ID: &'static str = "requirements-capabilities";
    pub const NAME: &'static str = "Requirements Capabilities Check";
}

/// Capabilities visible to the owner of a requirement
fn providers<'a>(
    ctx: &TaskContext<'a>,
    owner: Option<&'a ArtifactId>,
) -> impl Iterator<Item = &'a Capability> {
    let bundles = ctx
        .descriptor()
        .bundles
        .iter()
        .filter(move |bundle| Some(&bundle.artifact) != owner)
        .flat_map(|bundle| bundle.capabilities.iter());
    let feature = ctx.descriptor().capabilities.iter();
    let framework = ctx
        .framework()
        .into_iter()
        .flat_map(|framework| framework.capabilities.iter());

    bundles.chain(feature).chain(framework)
}

fn check(ctx: &mut TaskContext<'_>, owner: &str, requirement: &Requirement, satisfied: bool) {
    if satisfied {
        debug!("{}: requirement {} satisfied", owner, requirement);
    } else if requirement.is_optional() {
        ctx.report_warning(format!(
            "{owner} has an optional requirement {requirement} which no artifact in the feature or the framework provides"
        ));
    } else {
        ctx.report_error(format!(
            "{owner} requires {requirement} but no artifact in the feature or the framework provides a matching capability"
        ));
    }
}

impl AnalyserTask for RequirementsCapabilitiesCheck {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let descriptor = ctx.descriptor();

        for bundle in &descriptor.bundles {
            let owner = format!("Bundle {}", bundle.artifact);
            for requirement in bundle.requirements.iter().filter(|r| r.is_resolve_time()) {
                let satisfied =
                    providers(ctx, Some(&bundle.artifact)).any(|cap| requirement.matches(cap));
                check(ctx, &owner, requirement, satisfied);
            }
        }

        let owner = format!("Feature {}", descriptor.feature);
        for requirement in descriptor.requirements.iter().filter(|r| r.is_resolve_time()) {
            let satisfied = providers(ctx, None).any(|cap| requirement.matches(cap));
            check(ctx, &owner, requirement, satisfied);
        }

        Ok(())
    }
}
