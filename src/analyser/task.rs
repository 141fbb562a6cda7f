use anyhow::Result;

use super::context::TaskContext;

/// A single analysis check run against a feature.
///
/// Tasks are stateless: everything they look at comes through the context,
/// and everything they find goes back into it as a warning or an error.
/// Returning `Err` aborts the whole run and is reserved for failures of the
/// task itself, not for findings about the feature.
pub trait AnalyserTask: Send + Sync {
    /// Stable identifier used for selection and configuration
    fn id(&self) -> &str;

    /// Human readable name used in logging
    fn name(&self) -> &str;

    fn execute(&self, ctx: &mut TaskContext<'_>) -> Result<()>;
}
