//! [`GitOperations`] over the system `git` binary.

use super::{GitOperations, TagInfo};
use crate::context::Commit;
use crate::error::{GitError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';
const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%cI%x1f%B%x1e";
const TAG_FORMAT: &str = "--format=%(refname:strip=2)%09%(objectname)%09%(*objectname)";

/// Git backend spawning `git` in a working directory
#[derive(Debug, Clone)]
pub struct SystemGit {
    cwd: PathBuf,
    git: PathBuf,
}

impl SystemGit {
    /// Backend rooted at `cwd`; fails when no `git` executable is on `PATH`
    pub fn new(cwd: impl AsRef<Path>) -> Result<Self> {
        let git = which::which("git").map_err(|e| GitError::GitNotFound {
            reason: e.to_string(),
        })?;
        Ok(Self {
            cwd: cwd.as_ref().to_path_buf(),
            git,
        })
    }

    fn git_cmd(&self) -> Command {
        let mut cmd = Command::new(&self.git);
        cmd.current_dir(&self.cwd)
            .arg("-c")
            .arg("core.quotePath=false")
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);
        cmd
    }

    async fn output(&self, args: &[&str]) -> Result<Output> {
        log::debug!("git {}", args.join(" "));
        self.git_cmd()
            .args(args)
            .output()
            .await
            .map_err(|e| {
                GitError::CommandFailed {
                    command: args.join(" "),
                    stderr: e.to_string(),
                }
                .into()
            })
    }

    async fn stdout(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn succeeds(&self, args: &[&str]) -> Result<bool> {
        Ok(self.output(args).await?.status.success())
    }

    async fn branch_ref(&self, branch: &str) -> Result<Option<String>> {
        for candidate in [
            format!("refs/remotes/origin/{branch}"),
            format!("refs/heads/{branch}"),
        ] {
            let verify = format!("{candidate}^{{commit}}");
            if self
                .succeeds(&["rev-parse", "--verify", "--quiet", &verify])
                .await?
            {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

impl GitOperations for SystemGit {
    async fn is_repository(&self) -> Result<bool> {
        self.succeeds(&["rev-parse", "--git-dir"]).await
    }

    async fn is_shallow(&self) -> Result<bool> {
        let out = self
            .stdout(&["rev-parse", "--is-shallow-repository"])
            .await?;
        Ok(out.trim() == "true")
    }

    async fn unshallow(&self, repository_url: &str) -> Result<()> {
        self.stdout(&["fetch", "--unshallow", "--tags", repository_url])
            .await
            .map(|_| ())
    }

    async fn verify_auth(&self, repository_url: &str, branch: &str) -> Result<bool> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        self.succeeds(&["push", "--dry-run", "--no-verify", repository_url, &refspec])
            .await
    }

    async fn head(&self) -> Result<String> {
        Ok(self.stdout(&["rev-parse", "HEAD"]).await?.trim().to_string())
    }

    async fn current_branch(&self) -> Result<Option<String>> {
        let output = self.output(&["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((name != "HEAD" && !name.is_empty()).then_some(name))
    }

    async fn tags(&self, branch: &str) -> Result<Option<Vec<TagInfo>>> {
        let Some(reference) = self.branch_ref(branch).await? else {
            return Ok(None);
        };
        let out = self
            .stdout(&["tag", "--merged", &reference, TAG_FORMAT])
            .await?;
        Ok(Some(parse_tags(&out)))
    }

    async fn commits_since(&self, from: Option<&str>) -> Result<Vec<Commit>> {
        let range = match from {
            Some(from) => format!("{from}..HEAD"),
            None => "HEAD".to_string(),
        };
        let out = self.stdout(&["log", LOG_FORMAT, &range]).await?;
        parse_log(&out)
    }

    async fn tag(&self, name: &str, head: &str) -> Result<()> {
        self.stdout(&["tag", name, head]).await.map(|_| ())
    }

    async fn push(&self, repository_url: &str, branch: &str) -> Result<()> {
        let refspec = format!("HEAD:refs/heads/{branch}");
        self.stdout(&["push", "--tags", repository_url, &refspec])
            .await
            .map(|_| ())
    }

    async fn remote_url(&self) -> Result<Option<String>> {
        let output = self.output(&["remote", "get-url", "origin"]).await?;
        if !output.status.success() {
            return Ok(None);
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!url.is_empty()).then_some(url))
    }
}

fn parse_tags(out: &str) -> Vec<TagInfo> {
    out.lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next().filter(|name| !name.is_empty())?;
            let object = fields.next().unwrap_or_default();
            let peeled = fields.next().unwrap_or_default();
            Some(TagInfo {
                name: name.to_string(),
                target_commit: if peeled.is_empty() { object } else { peeled }.to_string(),
            })
        })
        .collect()
}

fn parse_log(out: &str) -> Result<Vec<Commit>> {
    out.split(RECORD_SEP)
        .map(|record| record.trim_start_matches('\n'))
        .filter(|record| !record.trim().is_empty())
        .map(|record| {
            let fields: Vec<&str> = record.splitn(5, FIELD_SEP).collect();
            let [hash, author_name, author_email, date, message] = fields[..] else {
                return Err(GitError::Parse {
                    command: "log".to_string(),
                    reason: format!("expected 5 fields, got {}", fields.len()),
                }
                .into());
            };
            let committed_at = DateTime::parse_from_rfc3339(date)
                .map_err(|e| GitError::Parse {
                    command: "log".to_string(),
                    reason: format!("invalid commit date '{date}': {e}"),
                })?
                .with_timezone(&Utc);
            Ok(Commit {
                hash: hash.to_string(),
                message: message.trim_end().to_string(),
                author_name: author_name.to_string(),
                author_email: author_email.to_string(),
                committed_at,
            })
        })
        .collect()
}
