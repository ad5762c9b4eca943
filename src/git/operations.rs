//! Git operations trait and types used by the release pipeline.

use crate::context::Commit;
use crate::error::Result;
use std::future::Future;

/// Git primitives required by a release run
pub trait GitOperations {
    /// Whether the working directory is inside a git repository
    fn is_repository(&self) -> impl Future<Output = Result<bool>>;

    /// Whether the clone has truncated history
    fn is_shallow(&self) -> impl Future<Output = Result<bool>>;

    /// Fetch the full history and every tag
    fn unshallow(&self, repository_url: &str) -> impl Future<Output = Result<()>>;

    /// Whether `branch` of `repository_url` accepts a push from this clone
    fn verify_auth(
        &self,
        repository_url: &str,
        branch: &str,
    ) -> impl Future<Output = Result<bool>>;

    /// Full hash of `HEAD`
    fn head(&self) -> impl Future<Output = Result<String>>;

    /// Name of the checked out branch, `None` when detached
    fn current_branch(&self) -> impl Future<Output = Result<Option<String>>>;

    /// Tags reachable from `branch`, `None` when the branch does not exist
    fn tags(&self, branch: &str) -> impl Future<Output = Result<Option<Vec<TagInfo>>>>;

    /// Commits reachable from `HEAD` but not from `from`, newest first
    fn commits_since(&self, from: Option<&str>) -> impl Future<Output = Result<Vec<Commit>>>;

    /// Create tag `name` pointing at `head`
    fn tag(&self, name: &str, head: &str) -> impl Future<Output = Result<()>>;

    /// Push `HEAD` to `branch` together with tags
    fn push(&self, repository_url: &str, branch: &str) -> impl Future<Output = Result<()>>;

    /// URL of the `origin` remote, if configured
    fn remote_url(&self) -> impl Future<Output = Result<Option<String>>>;
}

/// Information about a Git tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    /// Tag name
    pub name: String,
    /// Commit the tag points at, peeled for annotated tags
    pub target_commit: String,
}
