//! Release pipeline orchestration.
//!
//! [`SemanticRelease::run`] walks the release phases in order: preflight,
//! repository verification, history normalization, branch authorization, the
//! plugin steps, tagging, and publishing. The first failure aborts the remaining
//! phases and is handed to the [`FailureReporter`] before being returned.

mod reporter;

pub use reporter::FailureReporter;

use crate::branches::{self, BranchDescriptor};
use crate::ci::CiEnvironment;
use crate::cli::OutputManager;
use crate::config;
use crate::context::{
    NextRelease, PublishedRelease, ReleaseContext, ReleaseDescriptor, ReleaseOptions, ReleaseType,
};
use crate::error::{Result, SemanticReleaseError, codes};
use crate::git::GitOperations;
use crate::logger::Logger;
use crate::plugins::{ExtensionPoint, Pipeline, PluginRegistry};
use crate::version::{self, TagFormat};
use futures::FutureExt;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Why a run ended without publishing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Triggered by a pull request build
    PullRequest,
    /// The running branch is not configured to release
    IneligibleBranch(String),
    /// No commit calls for a release
    NoRelevantChanges,
}

/// Result of a run that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A release was tagged and published
    Published {
        /// The release that was made
        next_release: NextRelease,
        /// What each publish plugin reported
        releases: Vec<ReleaseDescriptor>,
    },
    /// Dry run: the release that would have been made
    DryRun(NextRelease),
    /// Nothing to do
    NotPublished(SkipReason),
}

impl RunOutcome {
    /// Whether a release was published
    pub fn is_published(&self) -> bool {
        matches!(self, RunOutcome::Published { .. })
    }
}

/// Commit observed after a `prepare` step differs from the one being released
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeadMoved {
    from: String,
    to: String,
}

impl HeadMoved {
    fn detect(release: &NextRelease, head: String) -> Option<Self> {
        (release.git_head != head).then(|| HeadMoved {
            from: release.git_head.clone(),
            to: head,
        })
    }
}

/// Release orchestrator for one repository
pub struct SemanticRelease<G> {
    git: G,
    plugins: PluginRegistry,
    options: ReleaseOptions,
    ci: CiEnvironment,
    output: OutputManager,
    secrets: Vec<String>,
}

impl<G: GitOperations> SemanticRelease<G> {
    /// Orchestrator over `git` running `plugins`
    pub fn new(
        git: G,
        plugins: PluginRegistry,
        options: ReleaseOptions,
        ci: CiEnvironment,
        output: OutputManager,
    ) -> Self {
        Self {
            git,
            plugins,
            options,
            ci,
            output,
            secrets: Vec::new(),
        }
    }

    /// Values masked in every line written during the run
    pub fn with_secrets(mut self, secrets: Vec<String>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Execute one release run
    pub async fn run(&self) -> Result<RunOutcome> {
        let _redaction = self.output.redact(self.secrets.clone());
        let logger = Logger::new(self.output.clone());

        let mut options = self.options.clone();
        if !self.ci.is_ci && !options.no_ci && !options.dry_run {
            logger.warn(
                "This run was not triggered in a known CI environment, running in dry-run mode",
            );
            options.dry_run = true;
        }
        if self.ci.is_ci && self.ci.is_pr && !options.no_ci {
            logger.log("This run was triggered by a pull request and therefore a new version won't be published");
            return Ok(RunOutcome::NotPublished(SkipReason::PullRequest));
        }

        let mut ctx = ReleaseContext::new(options);
        match self.execute(&mut ctx, &logger).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                FailureReporter::new(&self.plugins.fail, &logger)
                    .report(&ctx, &error)
                    .await;
                Err(error)
            }
        }
    }

    async fn execute(&self, ctx: &mut ReleaseContext, logger: &Logger) -> Result<RunOutcome> {
        // Repository verification
        config::verify(&ctx.options)?;
        if !self.git.is_repository().await? {
            return Err(SemanticReleaseError::new(
                codes::ENOGITREPO,
                "Not running from a git repository.",
            )
            .with_details("The release must run from the root of a git repository.")
            .into());
        }
        let tag_format = TagFormat::new(&ctx.options.tag_format)?;

        // History normalization
        if self.git.is_shallow().await? {
            logger.log("Fetching the full history of the shallow clone");
            self.git.unshallow(&ctx.options.repository_url).await?;
        }
        let mut history = BTreeMap::new();
        for config in &ctx.options.branches {
            if let Some(tags) = self.git.tags(&config.name).await? {
                history.insert(config.name.clone(), tag_format.normalize(&tags));
            }
        }
        ctx.branches = branches::resolve(&ctx.options.branches, &history)?;

        // Branch authorization
        let running = match &self.ci.branch {
            Some(branch) => Some(branch.clone()),
            None => self.git.current_branch().await?,
        };
        let Some(branch) = running
            .as_deref()
            .and_then(|name| ctx.branches.iter().find(|b| b.name == name))
            .cloned()
        else {
            let name = running.unwrap_or_else(|| "HEAD".to_string());
            logger.log(&format!(
                "This run was triggered on the branch {name}, while releases are configured \
                 to only be published from {}, therefore a new version won't be published",
                ctx.branches
                    .iter()
                    .map(|b| b.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
            return Ok(RunOutcome::NotPublished(SkipReason::IneligibleBranch(name)));
        };
        ctx.branch = Some(branch.clone());
        self.verify_auth(ctx, &branch).await?;

        logger.log(&format!(
            "Running automated release from branch {} on repository {}{}",
            branch.name,
            ctx.options.repository_url,
            if ctx.options.dry_run { " (dry-run)" } else { "" }
        ));

        Pipeline::new(
            ExtensionPoint::VerifyConditions,
            &self.plugins.verify_conditions,
            logger,
        )
        .settle_all(Arc::new(ctx.clone()), |plugin, ctx, logger| {
            async move { plugin.verify_conditions(&ctx, &logger).await }.boxed()
        })
        .await?;

        // Last release and commits
        ctx.last_release = version::last_release(&branch);
        match &ctx.last_release {
            Some(last) => logger.log(&format!(
                "Found git tag {} associated with version {} on branch {}",
                last.git_tag, last.version, branch.name
            )),
            None => logger.log(&format!("No git tag version found on branch {}", branch.name)),
        }
        let from = ctx.last_release.as_ref().map(|last| last.git_head.clone());
        ctx.commits = self.git.commits_since(from.as_deref()).await?;
        logger.log(&format!(
            "Found {} commits since last release",
            ctx.commits.len()
        ));

        let Some(release_type) = self.analyze(ctx, logger).await? else {
            logger.log("There are no relevant changes, so no new version is released");
            return Ok(RunOutcome::NotPublished(SkipReason::NoRelevantChanges));
        };

        // Next release
        let next_version = version::next_version(ctx.last_release.as_ref(), release_type, &branch)?;
        ctx.next_release = Some(NextRelease {
            release_type,
            git_tag: tag_format.render(&next_version),
            version: next_version,
            channel: branch.channel.clone(),
            git_head: self.git.head().await?,
            notes: None,
        });
        logger.log(&format!(
            "The next release version is {}",
            ctx.next_release.as_ref().map(|r| r.version.to_string()).unwrap_or_default()
        ));

        Pipeline::new(
            ExtensionPoint::VerifyRelease,
            &self.plugins.verify_release,
            logger,
        )
        .settle_all(Arc::new(ctx.clone()), |plugin, ctx, logger| {
            async move { plugin.verify_release(&ctx, &logger).await }.boxed()
        })
        .await?;

        let notes = self.generate_notes(ctx, logger).await?;
        let next = self.next_release_mut(ctx)?;
        next.notes = notes;

        if ctx.options.dry_run {
            let next = self.next_release(ctx)?.clone();
            logger.warn(&format!(
                "Skip {} tag creation in dry-run mode",
                next.git_tag
            ));
            match &next.notes {
                Some(notes) => {
                    logger.log(&format!("Release note for version {}:", next.version));
                    logger.markdown(notes);
                }
                None => logger.log(&format!("No release notes for version {}", next.version)),
            }
            return Ok(RunOutcome::DryRun(next));
        }

        self.prepare(ctx, logger).await?;

        // Tag and push
        let next = self.next_release(ctx)?.clone();
        self.git.tag(&next.git_tag, &next.git_head).await?;
        self.git
            .push(&ctx.options.repository_url, &branch.name)
            .await?;
        logger.success(&format!("Created tag {}", next.git_tag));

        ctx.releases = self.publish(ctx, &next, logger).await?;

        Pipeline::new(ExtensionPoint::Success, &self.plugins.success, logger)
            .settle_all(Arc::new(ctx.clone()), |plugin, ctx, logger| {
                async move { plugin.success(&ctx, &logger).await }.boxed()
            })
            .await?;

        logger.success(&format!(
            "Published release {} on {} channel",
            next.version,
            next.channel.as_deref().unwrap_or("default")
        ));
        Ok(RunOutcome::Published {
            next_release: next,
            releases: ctx.releases.clone(),
        })
    }

    async fn verify_auth(
        &self,
        ctx: &ReleaseContext,
        branch: &BranchDescriptor,
    ) -> Result<()> {
        let url = &ctx.options.repository_url;
        let cause = match self.git.verify_auth(url, &branch.name).await {
            Ok(true) => return Ok(()),
            Ok(false) => None,
            Err(error) => Some(error.to_string()),
        };

        log::debug!(
            "push permission check failed for {} on {}: {}",
            branch.name,
            url,
            cause.as_deref().unwrap_or("rejected")
        );
        let mut details = format!(
            "The release needs to push tags and commits to branch `{}` of `{url}`.\n\n\
             Make sure the credentials available to git in this environment can push to \
             that branch.",
            branch.name
        );
        if let Some(cause) = cause {
            details.push_str(&format!("\n\nThe check failed with:\n\n```\n{cause}\n```"));
        }
        Err(SemanticReleaseError::new(
            codes::EGITNOPERMISSION,
            format!("Cannot push to the Git repository {url}."),
        )
        .with_details(details)
        .into())
    }

    async fn analyze(
        &self,
        ctx: &ReleaseContext,
        logger: &Logger,
    ) -> Result<Option<ReleaseType>> {
        let types = Pipeline::new(
            ExtensionPoint::AnalyzeCommits,
            &self.plugins.analyze_commits,
            logger,
        )
        .sequential(Arc::new(ctx.for_analysis()), |plugin, ctx, logger| {
            async move { plugin.analyze_commits(&ctx, &logger).await }.boxed()
        })
        .await?;
        Ok(types.into_iter().flatten().max())
    }

    /// Run every notes generator, each seeing the notes produced before it
    async fn generate_notes(
        &self,
        ctx: &ReleaseContext,
        logger: &Logger,
    ) -> Result<Option<String>> {
        let mut base = ctx.clone();
        if let Some(next) = base.next_release.as_mut() {
            next.notes = None;
        }

        let results = Pipeline::new(
            ExtensionPoint::GenerateNotes,
            &self.plugins.generate_notes,
            logger,
        )
        .chained(
            Arc::new(base),
            |plugin, ctx, logger| async move { plugin.generate_notes(&ctx, &logger).await }.boxed(),
            |raw, _| raw,
            |input: Arc<ReleaseContext>, previous: &Option<String>| {
                let Some(notes) = previous.as_deref().filter(|n| !n.trim().is_empty()) else {
                    return input;
                };
                let mut next = (*input).clone();
                if let Some(release) = next.next_release.as_mut() {
                    release.notes = Some(join_notes(release.notes.as_deref(), notes));
                }
                Arc::new(next)
            },
        )
        .await?;

        let joined = results
            .into_iter()
            .flatten()
            .filter(|notes| !notes.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok((!joined.is_empty()).then_some(joined))
    }

    /// Run `prepare` one plugin at a time, tracking commits they create
    async fn prepare(&self, ctx: &mut ReleaseContext, logger: &Logger) -> Result<()> {
        for plugin in &self.plugins.prepare {
            Pipeline::new(
                ExtensionPoint::Prepare,
                std::slice::from_ref(plugin),
                logger,
            )
            .sequential(Arc::new(ctx.clone()), |plugin, ctx, logger| {
                async move { plugin.prepare(&ctx, &logger).await }.boxed()
            })
            .await?;

            let head = self.git.head().await?;
            if let Some(moved) = HeadMoved::detect(self.next_release(ctx)?, head) {
                self.on_head_moved(ctx, moved, logger).await?;
            }
        }
        Ok(())
    }

    async fn on_head_moved(
        &self,
        ctx: &mut ReleaseContext,
        moved: HeadMoved,
        logger: &Logger,
    ) -> Result<()> {
        log::debug!("HEAD moved from {} to {}", moved.from, moved.to);
        logger.log(&format!(
            "The prepare step created commit {}, regenerating release notes",
            moved.to
        ));
        self.next_release_mut(ctx)?.git_head = moved.to;
        let notes = self.generate_notes(ctx, logger).await?;
        self.next_release_mut(ctx)?.notes = notes;
        Ok(())
    }

    async fn publish(
        &self,
        ctx: &ReleaseContext,
        next: &NextRelease,
        logger: &Logger,
    ) -> Result<Vec<ReleaseDescriptor>> {
        let releases = Pipeline::new(ExtensionPoint::Publish, &self.plugins.publish, logger)
            .chained(
                Arc::new(ctx.clone()),
                |plugin, ctx, logger| async move { plugin.publish(&ctx, &logger).await }.boxed(),
                |raw: Option<PublishedRelease>, step| {
                    ReleaseDescriptor::merge(next, raw.unwrap_or_default(), step)
                },
                |input, _| input,
            )
            .await?;

        for release in &releases {
            logger.success(&format!(
                "Published release {} on {} channel{}",
                release.version,
                release.channel.as_deref().unwrap_or("default"),
                release
                    .url
                    .as_deref()
                    .map(|url| format!(": {url}"))
                    .unwrap_or_default()
            ));
        }
        Ok(releases)
    }

    fn next_release<'c>(&self, ctx: &'c ReleaseContext) -> Result<&'c NextRelease> {
        ctx.next_release
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("next release has not been computed").into())
    }

    fn next_release_mut<'c>(&self, ctx: &'c mut ReleaseContext) -> Result<&'c mut NextRelease> {
        ctx.next_release
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("next release has not been computed").into())
    }
}

fn join_notes(existing: Option<&str>, added: &str) -> String {
    match existing {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}\n\n{added}"),
        _ => added.to_string(),
    }
}
