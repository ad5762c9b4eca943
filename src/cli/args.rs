//! Command line argument parsing and validation.
//!
//! Every flag is optional: with none, the release runs from the current directory
//! using `.releaserc.toml` when present and the defaults otherwise.

use crate::config::ConfigOverrides;
use clap::Parser;
use std::path::PathBuf;

/// Automated version management and release publishing
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_semantic_release",
    version,
    about = "Automated version management and release publishing",
    long_about = "Decide the next version from the commits since the last release, \
generate release notes, tag the release and run the configured plugins.

Usage:
  kodegen_semantic_release
  kodegen_semantic_release --dry-run
  kodegen_semantic_release --branches main,next --tag-format 'release-{{version}}'"
)]
pub struct Args {
    /// Compute the release and print the notes without tagging or publishing
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Run outside a CI environment and on pull request builds
    #[arg(long)]
    pub no_ci: bool,

    /// Branches allowed to release, in priority order
    #[arg(short, long, value_delimiter = ',', value_name = "BRANCH")]
    pub branches: Option<Vec<String>>,

    /// Remote the release is pushed to
    #[arg(short = 'r', long, value_name = "URL")]
    pub repository_url: Option<String>,

    /// Tag name template, e.g. `v{{version}}`
    #[arg(short, long, value_name = "TEMPLATE")]
    pub tag_format: Option<String>,

    /// Plugins to run, in order
    #[arg(short, long, value_delimiter = ',', value_name = "PLUGIN")]
    pub plugins: Option<Vec<String>>,

    /// Configuration file instead of `.releaserc.toml`
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose diagnostics
    #[arg(long)]
    pub debug: bool,

    /// Repository directory, defaults to the current one
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self
            .branches
            .as_ref()
            .is_some_and(|branches| branches.iter().any(|b| b.trim().is_empty()))
        {
            return Err("--branches must not contain empty names".to_string());
        }
        if self
            .tag_format
            .as_ref()
            .is_some_and(|format| format.trim().is_empty())
        {
            return Err("--tag-format must not be empty".to_string());
        }
        if let Some(cwd) = &self.cwd
            && !cwd.is_dir()
        {
            return Err(format!("--cwd {} is not a directory", cwd.display()));
        }
        Ok(())
    }

    /// Flags that override the configuration file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            repository_url: self.repository_url.clone(),
            tag_format: self.tag_format.clone(),
            branches: self.branches.clone(),
            plugins: self.plugins.clone(),
            dry_run: self.dry_run,
            no_ci: self.no_ci,
        }
    }
}
