//! Command line interface for kodegen_semantic_release.
//!
//! Loads the configuration, resolves plugins, and runs the release against the
//! system git in the chosen directory.

mod args;
mod output;

pub use args::Args;
pub use output::{OutputManager, RedactionScope, secrets_from_env};

use crate::ci::CiEnvironment;
use crate::config::ReleaseConfig;
use crate::error::Result;
use crate::git::{GitOperations, SystemGit};
use crate::plugins::builtin;
use crate::release::{RunOutcome, SemanticRelease, SkipReason};

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(args).await
}

/// Run the release for parsed arguments, returning the process exit code
pub async fn execute(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.debug, false);

    if let Err(validation_error) = args.validate() {
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    match release(&args, &output).await {
        Ok(outcome) => {
            let _ = output.verbose(&describe(&outcome));
            Ok(0)
        }
        Err(e) => {
            output.error(&format!("Release failed: {}", e));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\nRecovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }
            Ok(1)
        }
    }
}

async fn release(args: &Args, output: &OutputManager) -> Result<RunOutcome> {
    let cwd = match &args.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir()?,
    };

    let config = match &args.config {
        Some(path) => ReleaseConfig::load(path)?,
        None => ReleaseConfig::discover(&cwd)?,
    }
    .with_overrides(args.overrides());

    let plugins = builtin::resolve(&config.plugins(), &cwd)?;
    let git = SystemGit::new(&cwd)?;
    let origin = match config.repository_url {
        Some(_) => None,
        None => git.remote_url().await?,
    };

    SemanticRelease::new(
        git,
        plugins,
        config.into_options(origin),
        CiEnvironment::detect(),
        output.clone(),
    )
    .with_secrets(secrets_from_env(std::env::vars()))
    .run()
    .await
}

/// Short description of an outcome for status lines
pub fn describe(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Published { next_release, releases } => format!(
            "Published {} ({} release{})",
            next_release.git_tag,
            releases.len(),
            if releases.len() == 1 { "" } else { "s" }
        ),
        RunOutcome::DryRun(next_release) => format!("Dry run: would publish {}", next_release.git_tag),
        RunOutcome::NotPublished(SkipReason::PullRequest) => "Not published: pull request build".to_string(),
        RunOutcome::NotPublished(SkipReason::IneligibleBranch(branch)) => {
            format!("Not published: branch {branch} is not a release branch")
        }
        RunOutcome::NotPublished(SkipReason::NoRelevantChanges) => {
            "Not published: no relevant changes".to_string()
        }
    }
}
