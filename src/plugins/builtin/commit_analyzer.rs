//! `commit-analyzer`: release type from conventional commit messages.

use super::conventional;
use crate::context::{Commit, ReleaseContext, ReleaseType};
use crate::error::{ConfigError, Result};
use crate::logger::Logger;
use crate::plugins::{AnalyzeCommits, Plugin};
use async_trait::async_trait;
use serde::Deserialize;

/// Maps a commit type to the release it triggers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseRule {
    /// Conventional commit type, e.g. `docs`
    #[serde(rename = "type")]
    pub kind: String,
    /// Release triggered, `None` for no release
    pub release: Option<ReleaseType>,
}

#[derive(Debug, Default, Deserialize)]
struct Options {
    #[serde(default)]
    release_rules: Vec<ReleaseRule>,
}

/// Conventional commits analyzer.
///
/// Breaking changes trigger a major release, `feat` a minor one, and `fix`, `perf`
/// and `revert` a patch. Configured `release_rules` take precedence over these
/// defaults for the types they name.
#[derive(Debug, Default)]
pub struct CommitAnalyzer {
    rules: Vec<ReleaseRule>,
}

impl CommitAnalyzer {
    /// Analyzer with the default rules only
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer configured from a plugin table
    pub fn from_options(options: toml::Table) -> Result<Self> {
        let options: Options = toml::Value::Table(options)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::InvalidPlugin {
                reason: format!("commit-analyzer: {e}"),
            })?;
        Ok(Self {
            rules: options.release_rules,
        })
    }

    fn classify(&self, commit: &Commit) -> Option<ReleaseType> {
        let parsed = conventional::parse(commit)?;
        if parsed.breaking {
            return Some(ReleaseType::Major);
        }
        if let Some(rule) = self.rules.iter().find(|rule| rule.kind == parsed.kind) {
            return rule.release;
        }
        match parsed.kind.as_str() {
            "feat" => Some(ReleaseType::Minor),
            "fix" | "perf" | "revert" => Some(ReleaseType::Patch),
            _ => None,
        }
    }
}

impl Plugin for CommitAnalyzer {
    fn name(&self) -> &str {
        "commit-analyzer"
    }
}

#[async_trait]
impl AnalyzeCommits for CommitAnalyzer {
    async fn analyze_commits(
        &self,
        ctx: &ReleaseContext,
        logger: &Logger,
    ) -> Result<Option<ReleaseType>> {
        let mut release_type = None;

        for commit in &ctx.commits {
            logger.log(&format!("Analyzing commit: {}", commit.subject()));
            match self.classify(commit) {
                Some(found) => {
                    logger.log(&format!("The release type for the commit is {found}"));
                    release_type = release_type.max(Some(found));
                }
                None => logger.log("The commit should not trigger a release"),
            }
        }

        match release_type {
            Some(found) => logger.log(&format!(
                "Analysis of {} commits complete: {found} release",
                ctx.commits.len()
            )),
            None => logger.log(&format!(
                "Analysis of {} commits complete: no release",
                ctx.commits.len()
            )),
        }
        Ok(release_type)
    }
}
