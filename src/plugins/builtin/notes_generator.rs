//! `release-notes-generator`: markdown notes grouped by commit type.

use super::conventional::{self, ConventionalCommit};
use crate::context::{Commit, ReleaseContext};
use crate::error::Result;
use crate::logger::Logger;
use crate::plugins::{GenerateNotes, Plugin};
use async_trait::async_trait;

const SECTIONS: [(&str, &str); 4] = [
    ("feat", "Features"),
    ("fix", "Bug Fixes"),
    ("perf", "Performance Improvements"),
    ("revert", "Reverts"),
];

/// Markdown release notes generator
#[derive(Debug, Default)]
pub struct NotesGenerator;

impl NotesGenerator {
    /// Create the generator
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for NotesGenerator {
    fn name(&self) -> &str {
        "release-notes-generator"
    }
}

#[async_trait]
impl GenerateNotes for NotesGenerator {
    async fn generate_notes(
        &self,
        ctx: &ReleaseContext,
        _logger: &Logger,
    ) -> Result<Option<String>> {
        let Some(next) = &ctx.next_release else {
            return Ok(None);
        };

        let compare = compare_url(
            &ctx.options.repository_url,
            ctx.last_release.as_ref().map(|last| last.git_tag.as_str()),
            &next.git_tag,
        );
        let date = chrono::Utc::now().format("%Y-%m-%d");

        let mut notes = String::new();
        let heading = if next.version.patch == 0 && next.version.pre.is_empty() {
            "##"
        } else {
            "###"
        };
        let title = match compare {
            Some(url) => format!("[{}]({url})", next.version),
            None => next.version.to_string(),
        };
        notes.push_str(&format!("{heading} {title} ({date})\n"));

        let parsed: Vec<(&Commit, ConventionalCommit)> = ctx
            .commits
            .iter()
            .filter_map(|commit| conventional::parse(commit).map(|parsed| (commit, parsed)))
            .collect();

        let breaking: Vec<_> = parsed.iter().filter(|(_, c)| c.breaking).collect();
        if !breaking.is_empty() {
            notes.push_str("\n### BREAKING CHANGES\n\n");
            for (commit, parsed) in breaking {
                let text = parsed.breaking_note.as_deref().unwrap_or(&parsed.subject);
                notes.push_str(&entry(commit, parsed.scope.as_deref(), text));
            }
        }

        for (kind, title) in SECTIONS {
            let entries: Vec<String> = parsed
                .iter()
                .filter(|(_, c)| c.kind == kind)
                .map(|(commit, c)| entry(commit, c.scope.as_deref(), &c.subject))
                .collect();
            if !entries.is_empty() {
                notes.push_str(&format!("\n### {title}\n\n"));
                notes.extend(entries);
            }
        }

        Ok(Some(notes))
    }
}

fn entry(commit: &Commit, scope: Option<&str>, text: &str) -> String {
    match scope {
        Some(scope) => format!("* **{scope}:** {text} ({})\n", commit.short_hash()),
        None => format!("* {text} ({})\n", commit.short_hash()),
    }
}

/// Compare link for web-hosted repositories
fn compare_url(repository_url: &str, from: Option<&str>, to: &str) -> Option<String> {
    let from = from?;
    let base = if let Some(rest) = repository_url.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        format!("https://{host}/{path}")
    } else if repository_url.starts_with("https://") || repository_url.starts_with("http://") {
        repository_url.to_string()
    } else {
        return None;
    };
    let base = base.trim_end_matches('/').trim_end_matches(".git");
    Some(format!("{base}/compare/{from}...{to}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputManager;
    use crate::context::{LastRelease, NextRelease, ReleaseOptions, ReleaseType};
    use semver::Version;

    fn context(messages: &[&str]) -> ReleaseContext {
        let mut ctx = ReleaseContext::new(ReleaseOptions {
            repository_url: "git@github.com:acme/widgets.git".to_string(),
            tag_format: "v{{version}}".to_string(),
            dry_run: false,
            no_ci: false,
            branches: Vec::new(),
        });
        ctx.commits = messages
            .iter()
            .enumerate()
            .map(|(i, message)| Commit {
                hash: format!("{i:0>10}"),
                message: message.to_string(),
                author_name: "Ada".to_string(),
                author_email: "ada@example.com".to_string(),
                committed_at: chrono::Utc::now(),
            })
            .collect();
        ctx.last_release = Some(LastRelease {
            version: Version::new(1, 2, 0),
            git_head: "old".to_string(),
            git_tag: "v1.2.0".to_string(),
            channel: None,
        });
        ctx.next_release = Some(NextRelease {
            release_type: ReleaseType::Minor,
            version: Version::new(1, 3, 0),
            channel: None,
            git_head: "new".to_string(),
            git_tag: "v1.3.0".to_string(),
            notes: None,
        });
        ctx
    }

    #[tokio::test]
    async fn test_sections_and_compare_link() {
        let ctx = context(&[
            "feat(cli): add --json",
            "fix: crash on empty input",
            "docs: readme",
            "feat!: new config format\n\nBREAKING CHANGE: config moved to TOML",
        ]);
        let logger = Logger::new(OutputManager::new(false, true));

        let notes = NotesGenerator::new()
            .generate_notes(&ctx, &logger)
            .await
            .unwrap()
            .unwrap();

        assert!(notes.starts_with(
            "## [1.3.0](https://github.com/acme/widgets/compare/v1.2.0...v1.3.0)"
        ));
        assert!(notes.contains("### BREAKING CHANGES\n\n* config moved to TOML (0000000)"));
        assert!(notes.contains("### Features\n\n* **cli:** add --json (0000000)"));
        assert!(notes.contains("### Bug Fixes\n\n* crash on empty input (0000000)"));
        assert!(!notes.contains("readme"));
    }

    #[test]
    fn test_compare_url_forms() {
        assert_eq!(
            compare_url("https://example.com/o/r.git", Some("v1"), "v2").as_deref(),
            Some("https://example.com/o/r/compare/v1...v2")
        );
        assert_eq!(compare_url("/tmp/repo", Some("v1"), "v2"), None);
        assert_eq!(compare_url("https://example.com/o/r", None, "v2"), None);
    }
}
