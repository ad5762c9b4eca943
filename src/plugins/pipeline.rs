//! Invocation of the implementations registered for one extension point.
//!
//! Two modes are supported:
//! - `settle_all`: every implementation runs against the same input; failures are
//!   collected and returned together once all have finished.
//! - `sequential` / `chained`: implementations run one after another, each input
//!   derived from the previous result; the first failure stops the chain.

use super::{ExtensionPoint, Plugin};
use crate::error::{AggregateError, ReleaseError, Result};
use crate::logger::Logger;
use futures::future::{BoxFuture, join_all};
use std::sync::Arc;

/// Which plugin produced a result, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepIdentity {
    /// Extension point being executed
    pub point: ExtensionPoint,
    /// Plugin name
    pub plugin: String,
    /// Position of the plugin within the extension point
    pub index: usize,
}

impl StepIdentity {
    fn wrap(&self, error: ReleaseError) -> ReleaseError {
        ReleaseError::Step {
            plugin: self.plugin.clone(),
            point: self.point,
            source: Box::new(error),
        }
    }
}

/// Executor for the implementations of a single extension point
pub struct Pipeline<'a, H: ?Sized> {
    point: ExtensionPoint,
    steps: &'a [Arc<H>],
    logger: &'a Logger,
}

impl<'a, H> Pipeline<'a, H>
where
    H: Plugin + ?Sized,
{
    /// Create an executor over `steps`
    pub fn new(point: ExtensionPoint, steps: &'a [Arc<H>], logger: &'a Logger) -> Self {
        Self {
            point,
            steps,
            logger,
        }
    }

    fn identity(&self, index: usize, plugin: &H) -> StepIdentity {
        StepIdentity {
            point: self.point,
            plugin: plugin.name().to_string(),
            index,
        }
    }

    fn scoped_logger(&self, identity: &StepIdentity) -> Logger {
        self.logger
            .scoped(&identity.plugin)
            .scoped(identity.point.as_str())
    }

    /// Run every implementation and fail with all collected failures.
    ///
    /// Implementations are polled concurrently; none is skipped because another
    /// failed. Results are returned in registration order.
    pub async fn settle_all<I, T, F>(&self, input: I, invoke: F) -> Result<Vec<T>>
    where
        I: Clone,
        F: Fn(Arc<H>, I, Logger) -> BoxFuture<'static, Result<T>>,
    {
        let runs = self.steps.iter().enumerate().map(|(index, plugin)| {
            let identity = self.identity(index, plugin);
            let future = invoke(
                Arc::clone(plugin),
                input.clone(),
                self.scoped_logger(&identity),
            );
            let logger = self.logger;
            async move {
                log_start(logger, &identity);
                let outcome = future.await;
                if outcome.is_ok() {
                    log_completed(logger, &identity);
                }
                (identity, outcome)
            }
        });

        let mut results = Vec::with_capacity(self.steps.len());
        let mut errors = Vec::new();
        for (identity, outcome) in join_all(runs).await {
            match outcome {
                Ok(value) => results.push(value),
                Err(error) => {
                    log::debug!("{} failed in {}: {}", identity.plugin, identity.point, error);
                    errors.push(identity.wrap(error));
                }
            }
        }

        if errors.is_empty() {
            Ok(results)
        } else {
            Err(AggregateError {
                point: Some(self.point),
                errors,
            }
            .into())
        }
    }

    /// Run implementations in order with the same input, stopping at the first failure
    pub async fn sequential<I, T, F>(&self, input: I, invoke: F) -> Result<Vec<T>>
    where
        I: Clone,
        F: Fn(Arc<H>, I, Logger) -> BoxFuture<'static, Result<T>>,
    {
        self.chained(input, invoke, |raw, _| raw, |input, _| input).await
    }

    /// Run implementations in order, decorating each result and deriving each input.
    ///
    /// `transform` decorates a raw result before it is collected; `next_input` builds
    /// the input of the next implementation from the previous input and the
    /// decorated result. The first failure is returned immediately and no later
    /// implementation runs.
    pub async fn chained<I, T, U, F, D, N>(
        &self,
        input: I,
        invoke: F,
        transform: D,
        mut next_input: N,
    ) -> Result<Vec<U>>
    where
        I: Clone,
        F: Fn(Arc<H>, I, Logger) -> BoxFuture<'static, Result<T>>,
        D: Fn(T, &StepIdentity) -> U,
        N: FnMut(I, &U) -> I,
    {
        let mut results: Vec<U> = Vec::with_capacity(self.steps.len());
        let mut input = input;

        for (index, plugin) in self.steps.iter().enumerate() {
            if let Some(previous) = results.last() {
                input = next_input(input, previous);
            }

            let identity = self.identity(index, plugin);
            log_start(self.logger, &identity);
            let raw = invoke(
                Arc::clone(plugin),
                input.clone(),
                self.scoped_logger(&identity),
            )
            .await
            .map_err(|error| identity.wrap(error))?;
            log_completed(self.logger, &identity);

            results.push(transform(raw, &identity));
        }

        Ok(results)
    }
}

fn log_start(logger: &Logger, identity: &StepIdentity) {
    logger.log(&format!(
        "Start step \"{}\" of plugin \"{}\"",
        identity.point, identity.plugin
    ));
}

fn log_completed(logger: &Logger, identity: &StepIdentity) {
    logger.success(&format!(
        "Completed step \"{}\" of plugin \"{}\"",
        identity.point, identity.plugin
    ));
}
