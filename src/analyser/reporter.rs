use std::sync::Arc;

use tracing::{error, warn};

/// Sink for the diagnostics of a finished run
pub trait Reporter: Send + Sync {
    fn warning(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default reporter, forwards diagnostics to the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn warning(&self, message: &str) {
        warn!("{}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }
}

impl<R: Reporter + ?Sized> Reporter for Arc<R> {
    fn warning(&self, message: &str) {
        (**self).warning(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}
