//! Error types for release orchestration.
//!
//! Failures fall into three groups: classified errors that carry a stable code and
//! optional long-form details, aggregates produced when several plugins of the same
//! step fail, and everything else, which is reported as an internal error.

use crate::plugins::ExtensionPoint;
use std::fmt;
use thiserror::Error;

/// Result type alias for release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Stable error codes raised by the release core
pub mod codes {
    /// Repository URL could not be determined
    pub const ENOREPOURL: &str = "ENOREPOURL";
    /// Working directory is not a git repository
    pub const ENOGITREPO: &str = "ENOGITREPO";
    /// Push to the remote is not authorized
    pub const EGITNOPERMISSION: &str = "EGITNOPERMISSION";
    /// Tag format does not produce a valid tag name
    pub const EINVALIDTAGFORMAT: &str = "EINVALIDTAGFORMAT";
    /// Tag format does not reference the version exactly once
    pub const ETAGNOVERSION: &str = "ETAGNOVERSION";
    /// Computed version falls outside the branch range
    pub const EINVALIDNEXTVERSION: &str = "EINVALIDNEXTVERSION";
    /// No release branch is configured
    pub const ENORELEASEBRANCHES: &str = "ENORELEASEBRANCHES";
    /// More than three release branches are configured
    pub const ETOOMANYRELEASEBRANCHES: &str = "ETOOMANYRELEASEBRANCHES";
    /// A branch name appears more than once
    pub const EDUPLICATEBRANCHES: &str = "EDUPLICATEBRANCHES";
    /// A maintenance branch has an unusable range
    pub const EMAINTENANCEBRANCH: &str = "EMAINTENANCEBRANCH";
    /// A prerelease branch has an invalid identifier
    pub const EPRERELEASEBRANCH: &str = "EPRERELEASEBRANCH";
    /// A configured plugin name does not resolve
    pub const EPLUGINNOTFOUND: &str = "EPLUGINNOTFOUND";
    /// A plugin returned an unknown release type
    pub const EINVALIDRELEASETYPE: &str = "EINVALIDRELEASETYPE";
    /// An exec plugin command exited unsuccessfully
    pub const ECOMMANDFAILED: &str = "ECOMMANDFAILED";
}

/// Main error type for all release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Expected failure with a stable code, forwarded to `fail` plugins
    #[error(transparent)]
    Classified(#[from] SemanticReleaseError),

    /// Several plugins of one settle-all step failed
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    /// Failure raised by a specific plugin during a step
    #[error("{plugin} failed during {point}: {source}")]
    Step {
        /// Plugin that raised the failure
        plugin: String,
        /// Step being executed
        point: ExtensionPoint,
        /// Underlying failure
        #[source]
        source: Box<ReleaseError>,
    },

    /// Git operation errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Version parsing errors
    #[error("Version error: {0}")]
    Version(#[from] semver::Error),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::RenderError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Classified failure carrying a stable code.
///
/// Plugins return these for conditions the user can act on; the failure reporter
/// passes them to `fail` plugins and prints the code, message, and details.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code} {message}")]
pub struct SemanticReleaseError {
    /// Stable error code
    pub code: String,
    /// Short human-readable message
    pub message: String,
    /// Optional long-form remediation in markdown
    pub details: Option<String>,
    /// Plugin that raised the error, when known
    pub plugin_name: Option<String>,
}

impl SemanticReleaseError {
    /// Create a classified error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            plugin_name: None,
        }
    }

    /// Attach markdown details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Every failure collected from a settle-all step
#[derive(Error, Debug)]
pub struct AggregateError {
    /// Step that produced the failures, `None` for configuration checks
    pub point: Option<ExtensionPoint>,
    /// Failures in plugin order
    pub errors: Vec<ReleaseError>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.point {
            Some(point) => write!(f, "{} failure(s) during {}", self.errors.len(), point)?,
            None => write!(f, "{} failure(s)", self.errors.len())?,
        }
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Git binary is unavailable
    #[error("git executable not found: {reason}")]
    GitNotFound {
        /// Reason for the error
        reason: String,
    },

    /// A git command exited unsuccessfully
    #[error("git {command} failed: {stderr}")]
    CommandFailed {
        /// Subcommand that failed
        command: String,
        /// Captured stderr
        stderr: String,
    },

    /// Git output could not be parsed
    #[error("unexpected git output from {command}: {reason}")]
    Parse {
        /// Subcommand that produced the output
        command: String,
        /// Reason for the error
        reason: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path
        path: std::path::PathBuf,
        /// IO failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for the expected schema
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: std::path::PathBuf,
        /// TOML failure
        #[source]
        source: toml::de::Error,
    },

    /// Plugin entry is malformed
    #[error("invalid plugin entry: {reason}")]
    InvalidPlugin {
        /// Reason for the error
        reason: String,
    },
}

/// Failures extracted from an error's causal chain
#[derive(Debug, Default)]
pub struct FailureSet<'a> {
    /// Failures with a stable code, in encounter order
    pub classified: Vec<SemanticReleaseError>,
    /// Everything else
    pub unknown: Vec<&'a ReleaseError>,
}

impl ReleaseError {
    /// Create a classified error
    pub fn classified(code: impl Into<String>, message: impl Into<String>) -> Self {
        ReleaseError::Classified(SemanticReleaseError::new(code, message))
    }

    /// Stable code when this error is classified
    pub fn code(&self) -> Option<&str> {
        match self {
            ReleaseError::Classified(e) => Some(&e.code),
            ReleaseError::Step { source, .. } => source.code(),
            ReleaseError::Anyhow(e) => e
                .downcast_ref::<SemanticReleaseError>()
                .map(|e| e.code.as_str()),
            _ => None,
        }
    }

    /// Flatten aggregates and plugin wrappers into classified and unknown failures.
    ///
    /// Classified errors found under a plugin wrapper are stamped with that plugin's
    /// name unless they already carry one.
    pub fn failures(&self) -> FailureSet<'_> {
        let mut set = FailureSet::default();
        self.collect_into(None, &mut set);
        set
    }

    fn collect_into<'a>(&'a self, plugin: Option<&str>, set: &mut FailureSet<'a>) {
        match self {
            ReleaseError::Aggregate(aggregate) => {
                for error in &aggregate.errors {
                    error.collect_into(plugin, set);
                }
            }
            ReleaseError::Step { plugin, source, .. } => {
                source.collect_into(Some(plugin), set);
            }
            ReleaseError::Classified(e) => set.classified.push(stamp(e, plugin)),
            ReleaseError::Anyhow(e) => match e.downcast_ref::<SemanticReleaseError>() {
                Some(classified) => set.classified.push(stamp(classified, plugin)),
                None => set.unknown.push(self),
            },
            _ => set.unknown.push(self),
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self.code() {
            Some(codes::EGITNOPERMISSION) => vec![
                "Verify the token in GH_TOKEN or GITHUB_TOKEN can push to the repository".to_string(),
                "Check the repository URL: git remote get-url origin".to_string(),
            ],
            Some(codes::ENOREPOURL) => vec![
                "Set repository_url in .releaserc.toml or pass --repository-url".to_string(),
                "Add an origin remote: git remote add origin <url>".to_string(),
            ],
            Some(codes::ENOGITREPO) => {
                vec!["Run from inside a git repository or pass --cwd".to_string()]
            }
            Some(codes::ETAGNOVERSION) | Some(codes::EINVALIDTAGFORMAT) => vec![
                "Use a tag_format containing {{version}} exactly once, e.g. v{{version}}".to_string(),
            ],
            Some(codes::EPLUGINNOTFOUND) => vec![
                "Built-in plugins: commit-analyzer, release-notes-generator, exec".to_string(),
            ],
            _ => match self {
                ReleaseError::Git(GitError::GitNotFound { .. }) => {
                    vec!["Install git and make sure it is on PATH".to_string()]
                }
                _ => vec!["Check the error message above for specific details".to_string()],
            },
        }
    }
}

fn stamp(error: &SemanticReleaseError, plugin: Option<&str>) -> SemanticReleaseError {
    let mut error = error.clone();
    if error.plugin_name.is_none() {
        error.plugin_name = plugin.map(str::to_string);
    }
    error
}
