//! Extension points and the registry of their implementations.
//!
//! Each extension point has its own capability trait. A plugin implements one or
//! more of them and is registered once per capability; the registry is resolved at
//! startup and never changes during a run.

pub mod builtin;
mod pipeline;

pub use pipeline::{Pipeline, StepIdentity};

use crate::context::{PublishedRelease, ReleaseContext, ReleaseType};
use crate::error::{Result, SemanticReleaseError};
use crate::logger::Logger;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Named release phases that delegate to plugins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    /// Check that every precondition for releasing holds
    VerifyConditions,
    /// Classify commits into a release type
    AnalyzeCommits,
    /// Validate the computed release
    VerifyRelease,
    /// Produce release notes
    GenerateNotes,
    /// Prepare artifacts, possibly committing to the repository
    Prepare,
    /// Publish the release
    Publish,
    /// Notify about a successful release
    Success,
    /// Notify about a failed release
    Fail,
}

impl ExtensionPoint {
    /// All extension points in execution order
    pub const ALL: [ExtensionPoint; 8] = [
        ExtensionPoint::VerifyConditions,
        ExtensionPoint::AnalyzeCommits,
        ExtensionPoint::VerifyRelease,
        ExtensionPoint::GenerateNotes,
        ExtensionPoint::Prepare,
        ExtensionPoint::Publish,
        ExtensionPoint::Success,
        ExtensionPoint::Fail,
    ];

    /// Name used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionPoint::VerifyConditions => "verifyConditions",
            ExtensionPoint::AnalyzeCommits => "analyzeCommits",
            ExtensionPoint::VerifyRelease => "verifyRelease",
            ExtensionPoint::GenerateNotes => "generateNotes",
            ExtensionPoint::Prepare => "prepare",
            ExtensionPoint::Publish => "publish",
            ExtensionPoint::Success => "success",
            ExtensionPoint::Fail => "fail",
        }
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity shared by every capability
pub trait Plugin: Send + Sync {
    /// Name shown in logs and stamped onto errors and releases
    fn name(&self) -> &str;
}

/// `verifyConditions` capability
#[async_trait]
pub trait VerifyConditions: Plugin {
    /// Fail if the release cannot proceed
    async fn verify_conditions(&self, ctx: &ReleaseContext, logger: &Logger) -> Result<()>;
}

/// `analyzeCommits` capability
#[async_trait]
pub trait AnalyzeCommits: Plugin {
    /// Release type called for by `ctx.commits`, or `None` for no release
    async fn analyze_commits(
        &self,
        ctx: &ReleaseContext,
        logger: &Logger,
    ) -> Result<Option<ReleaseType>>;
}

/// `verifyRelease` capability
#[async_trait]
pub trait VerifyRelease: Plugin {
    /// Fail if `ctx.next_release` must not be released
    async fn verify_release(&self, ctx: &ReleaseContext, logger: &Logger) -> Result<()>;
}

/// `generateNotes` capability
#[async_trait]
pub trait GenerateNotes: Plugin {
    /// Notes for `ctx.next_release`; notes from earlier generators are in
    /// `ctx.next_release.notes`
    async fn generate_notes(&self, ctx: &ReleaseContext, logger: &Logger)
    -> Result<Option<String>>;
}

/// `prepare` capability
#[async_trait]
pub trait Prepare: Plugin {
    /// Prepare the release; may create commits
    async fn prepare(&self, ctx: &ReleaseContext, logger: &Logger) -> Result<()>;
}

/// `publish` capability
#[async_trait]
pub trait Publish: Plugin {
    /// Publish the release, returning what was published if anything
    async fn publish(
        &self,
        ctx: &ReleaseContext,
        logger: &Logger,
    ) -> Result<Option<PublishedRelease>>;
}

/// `success` capability
#[async_trait]
pub trait Success: Plugin {
    /// Notify about `ctx.releases`
    async fn success(&self, ctx: &ReleaseContext, logger: &Logger) -> Result<()>;
}

/// `fail` capability
#[async_trait]
pub trait Fail: Plugin {
    /// Notify about classified failures
    async fn fail(
        &self,
        ctx: &ReleaseContext,
        errors: &[SemanticReleaseError],
        logger: &Logger,
    ) -> Result<()>;
}

/// Ordered implementations for every extension point
#[derive(Clone, Default)]
pub struct PluginRegistry {
    /// `verifyConditions` implementations
    pub verify_conditions: Vec<Arc<dyn VerifyConditions>>,
    /// `analyzeCommits` implementations
    pub analyze_commits: Vec<Arc<dyn AnalyzeCommits>>,
    /// `verifyRelease` implementations
    pub verify_release: Vec<Arc<dyn VerifyRelease>>,
    /// `generateNotes` implementations
    pub generate_notes: Vec<Arc<dyn GenerateNotes>>,
    /// `prepare` implementations
    pub prepare: Vec<Arc<dyn Prepare>>,
    /// `publish` implementations
    pub publish: Vec<Arc<dyn Publish>>,
    /// `success` implementations
    pub success: Vec<Arc<dyn Success>>,
    /// `fail` implementations
    pub fail: Vec<Arc<dyn Fail>>,
}

impl PluginRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a `verifyConditions` implementation
    pub fn with_verify_conditions(mut self, plugin: Arc<dyn VerifyConditions>) -> Self {
        self.verify_conditions.push(plugin);
        self
    }

    /// Register an `analyzeCommits` implementation
    pub fn with_analyze_commits(mut self, plugin: Arc<dyn AnalyzeCommits>) -> Self {
        self.analyze_commits.push(plugin);
        self
    }

    /// Register a `verifyRelease` implementation
    pub fn with_verify_release(mut self, plugin: Arc<dyn VerifyRelease>) -> Self {
        self.verify_release.push(plugin);
        self
    }

    /// Register a `generateNotes` implementation
    pub fn with_generate_notes(mut self, plugin: Arc<dyn GenerateNotes>) -> Self {
        self.generate_notes.push(plugin);
        self
    }

    /// Register a `prepare` implementation
    pub fn with_prepare(mut self, plugin: Arc<dyn Prepare>) -> Self {
        self.prepare.push(plugin);
        self
    }

    /// Register a `publish` implementation
    pub fn with_publish(mut self, plugin: Arc<dyn Publish>) -> Self {
        self.publish.push(plugin);
        self
    }

    /// Register a `success` implementation
    pub fn with_success(mut self, plugin: Arc<dyn Success>) -> Self {
        self.success.push(plugin);
        self
    }

    /// Register a `fail` implementation
    pub fn with_fail(mut self, plugin: Arc<dyn Fail>) -> Self {
        self.fail.push(plugin);
        self
    }

    /// Number of implementations registered for `point`
    pub fn count(&self, point: ExtensionPoint) -> usize {
        match point {
            ExtensionPoint::VerifyConditions => self.verify_conditions.len(),
            ExtensionPoint::AnalyzeCommits => self.analyze_commits.len(),
            ExtensionPoint::VerifyRelease => self.verify_release.len(),
            ExtensionPoint::GenerateNotes => self.generate_notes.len(),
            ExtensionPoint::Prepare => self.prepare.len(),
            ExtensionPoint::Publish => self.publish.len(),
            ExtensionPoint::Success => self.success.len(),
            ExtensionPoint::Fail => self.fail.len(),
        }
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for point in ExtensionPoint::ALL {
            map.entry(&point.as_str(), &self.count(point));
        }
        map.finish()
    }
}
