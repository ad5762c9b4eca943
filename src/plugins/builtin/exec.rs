//! `exec`: run shell commands at any extension point.
//!
//! Each `<point>_cmd` option (`verify_conditions_cmd`, `analyze_commits_cmd`, ...)
//! is a handlebars template rendered against the release context, then run with
//! `sh -c` in the working directory. Standard output is the step result where the
//! step has one: a release type for `analyzeCommits`, the notes for
//! `generateNotes`, and a JSON release object for `publish`.

use crate::context::{PublishedRelease, ReleaseContext, ReleaseType};
use crate::error::{ConfigError, ReleaseError, Result, SemanticReleaseError, codes};
use crate::logger::Logger;
use crate::plugins::{
    AnalyzeCommits, ExtensionPoint, Fail, GenerateNotes, Plugin, Prepare, Publish, Success,
    VerifyConditions, VerifyRelease,
};
use async_trait::async_trait;
use handlebars::Handlebars;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::process::Command;

/// Shell command runner
#[derive(Debug)]
pub struct Exec {
    cwd: PathBuf,
    shell: String,
    commands: HashMap<ExtensionPoint, String>,
}

impl Exec {
    /// Configure from a plugin table
    pub fn from_options(options: toml::Table, cwd: PathBuf) -> Result<Self> {
        let mut commands = HashMap::new();
        let mut shell = "sh".to_string();

        for (key, value) in options {
            let text = value
                .as_str()
                .ok_or_else(|| ConfigError::InvalidPlugin {
                    reason: format!("exec: `{key}` must be a string"),
                })?
                .to_string();
            if key == "shell" {
                shell = text;
                continue;
            }
            let point = ExtensionPoint::ALL
                .into_iter()
                .find(|point| option_name(*point) == key)
                .ok_or_else(|| ConfigError::InvalidPlugin {
                    reason: format!("exec: unknown option `{key}`"),
                })?;
            commands.insert(point, text);
        }

        Ok(Self {
            cwd,
            shell,
            commands,
        })
    }

    /// Whether a command is configured for `point`
    pub fn handles(&self, point: ExtensionPoint) -> bool {
        self.commands.contains_key(&point)
    }

    async fn run(
        &self,
        point: ExtensionPoint,
        ctx: &ReleaseContext,
        errors: &[SemanticReleaseError],
        logger: &Logger,
    ) -> Result<String> {
        let Some(template) = self.commands.get(&point) else {
            return Ok(String::new());
        };

        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        let command = registry.render_template(template, &template_data(ctx, errors))?;
        log::debug!("exec {}: {}", point, command);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&command)
            .current_dir(&self.cwd)
            .kill_on_drop(true)
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|line| !line.trim().is_empty()) {
            logger.log(line);
        }

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |code| format!("code {code}"));
            return Err(SemanticReleaseError::new(
                codes::ECOMMANDFAILED,
                format!("The `{}` command exited with {status}.", option_name(point)),
            )
            .with_details(format!(
                "Command:\n\n```\n{command}\n```\n\nOutput:\n\n```\n{}\n```",
                stderr.trim()
            ))
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn option_name(point: ExtensionPoint) -> &'static str {
    match point {
        ExtensionPoint::VerifyConditions => "verify_conditions_cmd",
        ExtensionPoint::AnalyzeCommits => "analyze_commits_cmd",
        ExtensionPoint::VerifyRelease => "verify_release_cmd",
        ExtensionPoint::GenerateNotes => "generate_notes_cmd",
        ExtensionPoint::Prepare => "prepare_cmd",
        ExtensionPoint::Publish => "publish_cmd",
        ExtensionPoint::Success => "success_cmd",
        ExtensionPoint::Fail => "fail_cmd",
    }
}

fn template_data(ctx: &ReleaseContext, errors: &[SemanticReleaseError]) -> Value {
    json!({
        "branch": ctx.branch.as_ref().map(|branch| &branch.name),
        "lastRelease": ctx.last_release,
        "nextRelease": ctx.next_release,
        "commits": ctx.commits,
        "releases": ctx.releases,
        "errors": errors
            .iter()
            .map(|e| json!({ "code": e.code, "message": e.message }))
            .collect::<Vec<_>>(),
    })
}

impl Plugin for Exec {
    fn name(&self) -> &str {
        "exec"
    }
}

#[async_trait]
impl VerifyConditions for Exec {
    async fn verify_conditions(&self, ctx: &ReleaseContext, logger: &Logger) -> Result<()> {
        self.run(ExtensionPoint::VerifyConditions, ctx, &[], logger)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl AnalyzeCommits for Exec {
    async fn analyze_commits(
        &self,
        ctx: &ReleaseContext,
        logger: &Logger,
    ) -> Result<Option<ReleaseType>> {
        let out = self
            .run(ExtensionPoint::AnalyzeCommits, ctx, &[], logger)
            .await?;
        if out.is_empty() {
            return Ok(None);
        }
        out.parse::<ReleaseType>().map(Some).map_err(|reason| {
            ReleaseError::from(
                SemanticReleaseError::new(
                    codes::EINVALIDRELEASETYPE,
                    format!("The `analyze_commits_cmd` printed an invalid release type: `{out}`."),
                )
                .with_details(format!("{reason}. Expected `major`, `minor`, `patch` or nothing.")),
            )
        })
    }
}

#[async_trait]
impl VerifyRelease for Exec {
    async fn verify_release(&self, ctx: &ReleaseContext, logger: &Logger) -> Result<()> {
        self.run(ExtensionPoint::VerifyRelease, ctx, &[], logger)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl GenerateNotes for Exec {
    async fn generate_notes(
        &self,
        ctx: &ReleaseContext,
        logger: &Logger,
    ) -> Result<Option<String>> {
        let out = self
            .run(ExtensionPoint::GenerateNotes, ctx, &[], logger)
            .await?;
        Ok((!out.is_empty()).then_some(out))
    }
}

#[async_trait]
impl Prepare for Exec {
    async fn prepare(&self, ctx: &ReleaseContext, logger: &Logger) -> Result<()> {
        self.run(ExtensionPoint::Prepare, ctx, &[], logger)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Publish for Exec {
    async fn publish(
        &self,
        ctx: &ReleaseContext,
        logger: &Logger,
    ) -> Result<Option<PublishedRelease>> {
        let out = self.run(ExtensionPoint::Publish, ctx, &[], logger).await?;
        if out.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<PublishedRelease>(&out) {
            Ok(release) => Ok(Some(release)),
            Err(e) => {
                logger.warn(&format!(
                    "The `publish_cmd` output is not a JSON release object ({e}); it is ignored"
                ));
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl Success for Exec {
    async fn success(&self, ctx: &ReleaseContext, logger: &Logger) -> Result<()> {
        self.run(ExtensionPoint::Success, ctx, &[], logger)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Fail for Exec {
    async fn fail(
        &self,
        ctx: &ReleaseContext,
        errors: &[SemanticReleaseError],
        logger: &Logger,
    ) -> Result<()> {
        self.run(ExtensionPoint::Fail, ctx, errors, logger)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputManager;
    use crate::context::{NextRelease, ReleaseOptions};
    use semver::Version;

    fn exec_with(options: &str) -> Exec {
        let table: toml::Table = toml::from_str(options).unwrap();
        Exec::from_options(table, std::env::temp_dir()).unwrap()
    }

    fn context() -> ReleaseContext {
        let mut ctx = ReleaseContext::new(ReleaseOptions {
            repository_url: "https://example.com/repo.git".to_string(),
            tag_format: "v{{version}}".to_string(),
            dry_run: false,
            no_ci: false,
            branches: Vec::new(),
        });
        ctx.next_release = Some(NextRelease {
            release_type: ReleaseType::Minor,
            version: Version::new(1, 3, 0),
            channel: None,
            git_head: "abc".to_string(),
            git_tag: "v1.3.0".to_string(),
            notes: None,
        });
        ctx
    }

    fn logger() -> Logger {
        Logger::new(OutputManager::new(false, true))
    }

    #[test]
    fn test_options_select_points() {
        let exec = exec_with(r#"prepare_cmd = "true""#);
        assert!(exec.handles(ExtensionPoint::Prepare));
        assert!(!exec.handles(ExtensionPoint::Publish));

        let table: toml::Table = toml::from_str(r#"deploy_cmd = "true""#).unwrap();
        assert!(Exec::from_options(table, std::env::temp_dir()).is_err());
    }

    #[tokio::test]
    async fn test_templates_are_rendered() {
        let exec = exec_with(r#"generate_notes_cmd = "echo released {{nextRelease.version}} as {{nextRelease.git_tag}}""#);
        let notes = exec.generate_notes(&context(), &logger()).await.unwrap();
        assert_eq!(notes.as_deref(), Some("released 1.3.0 as v1.3.0"));
    }

    #[tokio::test]
    async fn test_analyze_output_is_parsed() {
        let exec = exec_with(r#"analyze_commits_cmd = "echo major""#);
        let found = exec.analyze_commits(&context(), &logger()).await.unwrap();
        assert_eq!(found, Some(ReleaseType::Major));

        let exec = exec_with(r#"analyze_commits_cmd = "echo huge""#);
        let error = exec.analyze_commits(&context(), &logger()).await.unwrap_err();
        assert_eq!(error.code(), Some(codes::EINVALIDRELEASETYPE));
    }

    #[tokio::test]
    async fn test_publish_json_and_failure() {
        let exec = exec_with(
            r#"publish_cmd = "echo '{\"name\": \"tarball\", \"url\": \"https://example.com/1.3.0.tgz\"}'""#,
        );
        let published = exec.publish(&context(), &logger()).await.unwrap().unwrap();
        assert_eq!(published.name.as_deref(), Some("tarball"));

        let exec = exec_with(r#"prepare_cmd = "echo nope >&2; exit 3""#);
        let error = exec.prepare(&context(), &logger()).await.unwrap_err();
        assert_eq!(error.code(), Some(codes::ECOMMANDFAILED));
    }
}
