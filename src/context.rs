//! Shared data threaded through every release phase.
//!
//! One [`ReleaseContext`] exists per run. The orchestrator owns it exclusively and
//! hands plugins an immutable [`std::sync::Arc`] snapshot, so nothing a plugin does
//! can write back into it.

use crate::branches::{BranchConfig, BranchDescriptor};
use crate::plugins::StepIdentity;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SKIP_RELEASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[skip\s+release\]|\[release\s+skip\]").expect("static regex is valid")
});

/// Run configuration, fixed once the run starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOptions {
    /// Remote the release is pushed to
    pub repository_url: String,
    /// Handlebars template producing the tag name from `{{version}}`
    pub tag_format: String,
    /// Skip every side effect and only print the notes
    pub dry_run: bool,
    /// Skip CI environment checks
    pub no_ci: bool,
    /// Configured branches in priority order
    pub branches: Vec<BranchConfig>,
}

/// Most recent release reachable from the running branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastRelease {
    /// Released version
    pub version: Version,
    /// Commit the release tag points at
    pub git_head: String,
    /// Tag name
    pub git_tag: String,
    /// Channel the release was made on
    pub channel: Option<String>,
}

/// A commit since the last release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    /// Full commit hash
    pub hash: String,
    /// Full commit message
    pub message: String,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Commit timestamp
    pub committed_at: chrono::DateTime<chrono::Utc>,
}

impl Commit {
    /// First line of the message
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// Short commit hash
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(7)]
    }

    /// Whether the message opts out of release analysis
    pub fn skips_release(&self) -> bool {
        SKIP_RELEASE.is_match(&self.message)
    }
}

/// Kind of version bump a set of commits calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Backwards-compatible fixes
    Patch,
    /// Backwards-compatible features
    Minor,
    /// Breaking changes
    Major,
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReleaseType::Patch => "patch",
            ReleaseType::Minor => "minor",
            ReleaseType::Major => "major",
        })
    }
}

impl FromStr for ReleaseType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patch" => Ok(ReleaseType::Patch),
            "minor" => Ok(ReleaseType::Minor),
            "major" => Ok(ReleaseType::Major),
            other => Err(format!("unknown release type '{other}'")),
        }
    }
}

/// The release being produced by this run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextRelease {
    /// Bump applied to the last release
    pub release_type: ReleaseType,
    /// Computed version
    pub version: Version,
    /// Channel of the running branch
    pub channel: Option<String>,
    /// Commit the tag will point at
    pub git_head: String,
    /// Tag name
    pub git_tag: String,
    /// Generated release notes
    pub notes: Option<String>,
}

/// Fields a publish plugin reports about a release it made
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishedRelease {
    /// Human-readable release name
    #[serde(default)]
    pub name: Option<String>,
    /// Where the release can be found
    #[serde(default)]
    pub url: Option<String>,
    /// Channel override
    #[serde(default)]
    pub channel: Option<String>,
    /// Any other plugin-specific fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A publish result decorated with the release identity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseDescriptor {
    /// Bump applied
    pub release_type: ReleaseType,
    /// Released version
    pub version: Version,
    /// Tagged commit
    pub git_head: String,
    /// Tag name
    pub git_tag: String,
    /// Channel, plugin override first
    pub channel: Option<String>,
    /// Release notes
    pub notes: Option<String>,
    /// Release name reported by the plugin
    pub name: Option<String>,
    /// Release URL reported by the plugin
    pub url: Option<String>,
    /// Plugin-specific fields
    pub extra: serde_json::Map<String, serde_json::Value>,
    /// Plugin that produced this release
    pub plugin_name: String,
}

impl ReleaseDescriptor {
    /// Merge a publish result onto the release identity.
    ///
    /// Precedence, lowest to highest: `release` fields, `published` fields, `step`
    /// identity. A plugin may override the channel but never the plugin name.
    pub fn merge(release: &NextRelease, published: PublishedRelease, step: &StepIdentity) -> Self {
        Self {
            release_type: release.release_type,
            version: release.version.clone(),
            git_head: release.git_head.clone(),
            git_tag: release.git_tag.clone(),
            channel: published.channel.or_else(|| release.channel.clone()),
            notes: release.notes.clone(),
            name: published.name,
            url: published.url,
            extra: published.extra,
            plugin_name: step.plugin.clone(),
        }
    }
}

/// Shared state of one release run
#[derive(Debug, Clone)]
pub struct ReleaseContext {
    /// Run configuration
    pub options: ReleaseOptions,
    /// Authorized branches
    pub branches: Vec<BranchDescriptor>,
    /// The running branch, once authorized
    pub branch: Option<BranchDescriptor>,
    /// Last release on the running branch
    pub last_release: Option<LastRelease>,
    /// Every commit since the last release
    pub commits: Vec<Commit>,
    /// Release being produced
    pub next_release: Option<NextRelease>,
    /// Releases reported by publish plugins
    pub releases: Vec<ReleaseDescriptor>,
}

impl ReleaseContext {
    /// Create an empty context for a run
    pub fn new(options: ReleaseOptions) -> Self {
        Self {
            options,
            branches: Vec::new(),
            branch: None,
            last_release: None,
            commits: Vec::new(),
            next_release: None,
            releases: Vec::new(),
        }
    }

    /// Copy of this context whose commit list excludes skip-marked commits
    pub fn for_analysis(&self) -> Self {
        let mut view = self.clone();
        view.commits.retain(|commit| !commit.skips_release());
        view
    }
}
