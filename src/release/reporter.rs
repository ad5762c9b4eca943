//! Failure reporting for a release run.

use crate::context::ReleaseContext;
use crate::error::{ReleaseError, SemanticReleaseError};
use crate::logger::Logger;
use crate::plugins::{ExtensionPoint, Fail, Pipeline};
use futures::FutureExt;
use std::error::Error as _;
use std::sync::Arc;

/// Reports a failed run to the user and to `fail` plugins
pub struct FailureReporter<'a> {
    fail: &'a [Arc<dyn Fail>],
    logger: &'a Logger,
}

impl<'a> FailureReporter<'a> {
    /// Reporter notifying `fail` implementations
    pub fn new(fail: &'a [Arc<dyn Fail>], logger: &'a Logger) -> Self {
        Self { fail, logger }
    }

    /// Report `error` raised while `ctx` was being processed.
    ///
    /// Classified failures are handed to `fail` plugins unless the run is a dry
    /// run; a failing `fail` plugin is logged and otherwise ignored. Classified
    /// failures are then printed before unknown ones.
    pub async fn report(&self, ctx: &ReleaseContext, error: &ReleaseError) {
        let failures = error.failures();

        if !failures.classified.is_empty() && !ctx.options.dry_run {
            let input = (
                Arc::new(ctx.clone()),
                Arc::new(failures.classified.clone()),
            );
            let outcome = Pipeline::new(ExtensionPoint::Fail, self.fail, self.logger)
                .settle_all(
                    input,
                    |plugin, (ctx, errors): (Arc<ReleaseContext>, Arc<Vec<SemanticReleaseError>>), logger| {
                        async move { plugin.fail(&ctx, &errors, &logger).await }.boxed()
                    },
                )
                .await;
            if let Err(fail_error) = outcome {
                self.logger
                    .error(&format!("A fail step could not be completed: {fail_error}"));
            }
        }

        for classified in &failures.classified {
            let origin = classified
                .plugin_name
                .as_deref()
                .map(|plugin| format!(" (raised by {plugin})"))
                .unwrap_or_default();
            self.logger.error(&format!(
                "{} {}{}",
                classified.code, classified.message, origin
            ));
            if let Some(details) = &classified.details {
                self.logger.markdown(details);
            }
        }

        for unknown in &failures.unknown {
            self.logger.error("An internal error occurred:");
            self.logger.error(&unknown.to_string());
            let mut source = unknown.source();
            while let Some(cause) = source {
                log::debug!("caused by: {}", cause);
                source = cause.source();
            }
        }
    }
}
