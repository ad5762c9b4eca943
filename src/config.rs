//! Release configuration.
//!
//! Settings come from `.releaserc.toml` in the working directory (or an explicit
//! path) and are then overridden by command line flags.

use crate::branches::BranchConfig;
use crate::context::ReleaseOptions;
use crate::error::{AggregateError, ConfigError, ReleaseError, Result, SemanticReleaseError, codes};
use crate::version::{DEFAULT_TAG_FORMAT, TagFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File looked up in the working directory
pub const CONFIG_FILE: &str = ".releaserc.toml";

/// A configured plugin: a bare name or a table with options
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PluginEntry {
    /// Plugin without options
    Name(String),
    /// Plugin with options
    Detailed {
        /// Plugin name
        name: String,
        /// Everything else in the table
        #[serde(flatten)]
        options: toml::Table,
    },
}

impl PluginEntry {
    /// Plugin name
    pub fn name(&self) -> &str {
        match self {
            PluginEntry::Name(name) | PluginEntry::Detailed { name, .. } => name,
        }
    }

    /// Plugin options, empty for bare names
    pub fn options(&self) -> toml::Table {
        match self {
            PluginEntry::Name(_) => toml::Table::new(),
            PluginEntry::Detailed { options, .. } => options.clone(),
        }
    }
}

/// Contents of `.releaserc.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Remote to push releases to
    pub repository_url: Option<String>,
    /// Tag name template
    pub tag_format: Option<String>,
    /// Branches allowed to release
    pub branches: Option<Vec<BranchConfig>>,
    /// Plugins in execution order
    pub plugins: Option<Vec<PluginEntry>>,
    /// Never publish
    pub dry_run: Option<bool>,
    /// `false` skips CI environment checks
    pub ci: Option<bool>,
}

/// Values given on the command line, which win over the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `--repository-url`
    pub repository_url: Option<String>,
    /// `--tag-format`
    pub tag_format: Option<String>,
    /// `--branches`
    pub branches: Option<Vec<String>>,
    /// `--plugins`
    pub plugins: Option<Vec<String>>,
    /// `--dry-run`
    pub dry_run: bool,
    /// `--no-ci`
    pub no_ci: bool,
}

impl ReleaseConfig {
    /// Parse the file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Load `.releaserc.toml` from `cwd`, or defaults when there is none
    pub fn discover(cwd: &Path) -> Result<Self> {
        let path = cwd.join(CONFIG_FILE);
        if path.is_file() {
            log::debug!("Loading configuration from {}", path.display());
            Self::load(&path)
        } else {
            log::debug!("No {} in {}, using defaults", CONFIG_FILE, cwd.display());
            Ok(Self::default())
        }
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| {
            ConfigError::Parse {
                path: PathBuf::from(path),
                source,
            }
            .into()
        })
    }

    /// Apply command line overrides
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(url) = overrides.repository_url {
            self.repository_url = Some(url);
        }
        if let Some(format) = overrides.tag_format {
            self.tag_format = Some(format);
        }
        if let Some(branches) = overrides.branches {
            self.branches = Some(branches.into_iter().map(BranchConfig::named).collect());
        }
        if let Some(plugins) = overrides.plugins {
            self.plugins = Some(plugins.into_iter().map(PluginEntry::Name).collect());
        }
        if overrides.dry_run {
            self.dry_run = Some(true);
        }
        if overrides.no_ci {
            self.ci = Some(false);
        }
        self
    }

    /// Configured plugins, or the default analyzer and notes generator
    pub fn plugins(&self) -> Vec<PluginEntry> {
        self.plugins.clone().unwrap_or_else(|| {
            vec![
                PluginEntry::Name("commit-analyzer".to_string()),
                PluginEntry::Name("release-notes-generator".to_string()),
            ]
        })
    }

    /// Run options; `origin_url` is used when no repository URL is configured
    pub fn into_options(self, origin_url: Option<String>) -> ReleaseOptions {
        ReleaseOptions {
            repository_url: self.repository_url.or(origin_url).unwrap_or_default(),
            tag_format: self
                .tag_format
                .unwrap_or_else(|| DEFAULT_TAG_FORMAT.to_string()),
            dry_run: self.dry_run.unwrap_or(false),
            no_ci: self.ci == Some(false),
            branches: self.branches.unwrap_or_else(default_branches),
        }
    }
}

/// Branches used when none are configured
pub fn default_branches() -> Vec<BranchConfig> {
    vec![
        BranchConfig::named("main"),
        BranchConfig::named("master"),
        BranchConfig::named("next"),
        BranchConfig::named("next-major"),
        BranchConfig::prerelease("beta"),
        BranchConfig::prerelease("alpha"),
    ]
}

/// Check the options a run cannot start without, reporting every problem at once
pub fn verify(options: &ReleaseOptions) -> Result<()> {
    let mut errors: Vec<ReleaseError> = Vec::new();

    if options.repository_url.trim().is_empty() {
        errors.push(
            SemanticReleaseError::new(codes::ENOREPOURL, "The repository URL could not be determined.")
                .with_details(
                    "Set `repository_url` in `.releaserc.toml`, pass `--repository-url`, \
                     or add an `origin` remote to the repository.",
                )
                .into(),
        );
    }

    if let Err(error) = TagFormat::new(&options.tag_format) {
        errors.push(error);
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(AggregateError { point: None, errors }.into()),
    }
}
