//! Shared fixtures: an in-memory git backend and scripted plugins.

#![allow(dead_code)]

use async_trait::async_trait;
use kodegen_semantic_release::ci::CiEnvironment;
use kodegen_semantic_release::cli::OutputManager;
use kodegen_semantic_release::context::{Commit, PublishedRelease, ReleaseContext, ReleaseType};
use kodegen_semantic_release::error::{GitError, ReleaseError, Result, SemanticReleaseError};
use kodegen_semantic_release::git::{GitOperations, TagInfo};
use kodegen_semantic_release::logger::Logger;
use kodegen_semantic_release::plugins::{
    AnalyzeCommits, ExtensionPoint, Fail, GenerateNotes, Plugin, Prepare, Publish, Success,
    VerifyConditions, VerifyRelease,
};
use kodegen_semantic_release::{ReleaseOptions, branches::BranchConfig};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Repository state observed and mutated by [`FakeGit`]
#[derive(Debug, Default)]
pub struct GitState {
    pub shallow: bool,
    pub unshallowed: bool,
    pub push_allowed: bool,
    /// Failure reported by the push permission check
    pub auth_error: Option<String>,
    pub head: String,
    pub current_branch: Option<String>,
    pub branch_tags: HashMap<String, Vec<TagInfo>>,
    /// Newest first
    pub commits: Vec<Commit>,
    pub created_tags: Vec<(String, String)>,
    pub pushes: Vec<(String, String)>,
}

/// In-memory [`GitOperations`]
#[derive(Debug, Clone, Default)]
pub struct FakeGit {
    pub state: Arc<Mutex<GitState>>,
}

impl FakeGit {
    /// Repository on `branch` whose only tag is `v1.2.0` at commit `c0`
    pub fn on_main() -> Self {
        let git = FakeGit::default();
        {
            let mut state = git.state.lock().unwrap();
            state.push_allowed = true;
            state.head = "c1".to_string();
            state.current_branch = Some("main".to_string());
            state.branch_tags.insert(
                "main".to_string(),
                vec![TagInfo {
                    name: "v1.2.0".to_string(),
                    target_commit: "c0".to_string(),
                }],
            );
            state.commits = vec![commit("c1", "feat: add widgets"), commit("c0", "chore: init")];
        }
        git
    }

    pub fn with_commits(self, commits: Vec<Commit>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(first) = commits.first() {
                state.head = first.hash.clone();
            }
            state.commits = commits;
        }
        self
    }

    pub fn set_head(&self, head: &str) {
        self.state.lock().unwrap().head = head.to_string();
    }

    pub fn created_tags(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().created_tags.clone()
    }

    pub fn pushes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().pushes.clone()
    }
}

impl GitOperations for FakeGit {
    async fn is_repository(&self) -> Result<bool> {
        Ok(true)
    }

    async fn is_shallow(&self) -> Result<bool> {
        Ok(self.state.lock().unwrap().shallow)
    }

    async fn unshallow(&self, _repository_url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.shallow = false;
        state.unshallowed = true;
        Ok(())
    }

    async fn verify_auth(&self, _repository_url: &str, branch: &str) -> Result<bool> {
        let state = self.state.lock().unwrap();
        if let Some(stderr) = &state.auth_error {
            return Err(GitError::CommandFailed {
                command: format!("push --dry-run origin HEAD:refs/heads/{branch}"),
                stderr: stderr.clone(),
            }
            .into());
        }
        Ok(state.push_allowed)
    }

    async fn head(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().head.clone())
    }

    async fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().current_branch.clone())
    }

    async fn tags(&self, branch: &str) -> Result<Option<Vec<TagInfo>>> {
        Ok(self.state.lock().unwrap().branch_tags.get(branch).cloned())
    }

    async fn commits_since(&self, from: Option<&str>) -> Result<Vec<Commit>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .commits
            .iter()
            .take_while(|commit| Some(commit.hash.as_str()) != from)
            .cloned()
            .collect())
    }

    async fn tag(&self, name: &str, head: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .created_tags
            .push((name.to_string(), head.to_string()));
        Ok(())
    }

    async fn push(&self, repository_url: &str, branch: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .pushes
            .push((repository_url.to_string(), branch.to_string()));
        Ok(())
    }

    async fn remote_url(&self) -> Result<Option<String>> {
        Ok(Some("https://example.com/acme/widgets.git".to_string()))
    }
}

pub fn commit(hash: &str, message: &str) -> Commit {
    Commit {
        hash: hash.to_string(),
        message: message.to_string(),
        author_name: "Ada".to_string(),
        author_email: "ada@example.com".to_string(),
        committed_at: chrono::Utc::now(),
    }
}

pub fn options() -> ReleaseOptions {
    ReleaseOptions {
        repository_url: "https://example.com/acme/widgets.git".to_string(),
        tag_format: "v{{version}}".to_string(),
        dry_run: false,
        no_ci: false,
        branches: vec![BranchConfig::named("main"), BranchConfig::named("next")],
    }
}

pub fn ci_push(branch: &str) -> CiEnvironment {
    CiEnvironment {
        is_ci: true,
        service: Some("github".to_string()),
        branch: Some(branch.to_string()),
        is_pr: false,
    }
}

pub fn quiet_output() -> OutputManager {
    OutputManager::new(false, true)
}

/// What a scripted plugin saw when it was invoked
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub plugin: String,
    pub point: ExtensionPoint,
    pub commit_count: usize,
    pub git_head: Option<String>,
    pub notes: Option<String>,
    pub releases: usize,
    pub errors: Vec<String>,
}

/// Shared, ordered record of plugin invocations
pub type Journal = Arc<Mutex<Vec<Observation>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn invoked(journal: &Journal, point: ExtensionPoint) -> Vec<String> {
    journal
        .lock()
        .unwrap()
        .iter()
        .filter(|o| o.point == point)
        .map(|o| o.plugin.clone())
        .collect()
}

/// Plugin with scripted results for every extension point
pub struct Scripted {
    name: String,
    journal: Journal,
    release_type: Option<ReleaseType>,
    notes: Option<String>,
    published: Option<PublishedRelease>,
    failing: HashSet<ExtensionPoint>,
    failure_code: String,
    unclassified: bool,
    on_prepare: Option<Box<dyn Fn() + Send + Sync>>,
    notes_from_head: bool,
}

impl Scripted {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            release_type: None,
            notes: None,
            published: None,
            failing: HashSet::new(),
            failure_code: "EFAKE".to_string(),
            unclassified: false,
            on_prepare: None,
            notes_from_head: false,
        }
    }

    pub fn analyzes(mut self, release_type: ReleaseType) -> Self {
        self.release_type = Some(release_type);
        self
    }

    pub fn writes_notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    /// Notes mention the head they were generated for
    pub fn notes_from_head(mut self) -> Self {
        self.notes_from_head = true;
        self
    }

    pub fn publishes(mut self, name: &str) -> Self {
        self.published = Some(PublishedRelease {
            name: Some(name.to_string()),
            url: Some(format!("https://example.com/{name}")),
            ..Default::default()
        });
        self
    }

    pub fn fails_at(mut self, point: ExtensionPoint, code: &str) -> Self {
        self.failing.insert(point);
        self.failure_code = code.to_string();
        self
    }

    pub fn fails_unclassified_at(mut self, point: ExtensionPoint) -> Self {
        self.failing.insert(point);
        self.unclassified = true;
        self
    }

    pub fn on_prepare(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_prepare = Some(Box::new(hook));
        self
    }

    fn record(
        &self,
        point: ExtensionPoint,
        ctx: &ReleaseContext,
        errors: &[SemanticReleaseError],
    ) -> Result<()> {
        self.journal.lock().unwrap().push(Observation {
            plugin: self.name.clone(),
            point,
            commit_count: ctx.commits.len(),
            git_head: ctx.next_release.as_ref().map(|r| r.git_head.clone()),
            notes: ctx.next_release.as_ref().and_then(|r| r.notes.clone()),
            releases: ctx.releases.len(),
            errors: errors.iter().map(|e| e.code.clone()).collect(),
        });

        if !self.failing.contains(&point) {
            return Ok(());
        }
        if self.unclassified {
            return Err(ReleaseError::Io(std::io::Error::other(format!(
                "{} broke during {point}",
                self.name
            ))));
        }
        Err(SemanticReleaseError::new(
            self.failure_code.clone(),
            format!("{} refused {point}", self.name),
        )
        .into())
    }
}

impl Plugin for Scripted {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl VerifyConditions for Scripted {
    async fn verify_conditions(&self, ctx: &ReleaseContext, _logger: &Logger) -> Result<()> {
        self.record(ExtensionPoint::VerifyConditions, ctx, &[])
    }
}

#[async_trait]
impl AnalyzeCommits for Scripted {
    async fn analyze_commits(
        &self,
        ctx: &ReleaseContext,
        _logger: &Logger,
    ) -> Result<Option<ReleaseType>> {
        self.record(ExtensionPoint::AnalyzeCommits, ctx, &[])?;
        Ok(self.release_type)
    }
}

#[async_trait]
impl VerifyRelease for Scripted {
    async fn verify_release(&self, ctx: &ReleaseContext, _logger: &Logger) -> Result<()> {
        self.record(ExtensionPoint::VerifyRelease, ctx, &[])
    }
}

#[async_trait]
impl GenerateNotes for Scripted {
    async fn generate_notes(
        &self,
        ctx: &ReleaseContext,
        _logger: &Logger,
    ) -> Result<Option<String>> {
        self.record(ExtensionPoint::GenerateNotes, ctx, &[])?;
        if self.notes_from_head {
            return Ok(ctx
                .next_release
                .as_ref()
                .map(|release| format!("notes for {}", release.git_head)));
        }
        Ok(self.notes.clone())
    }
}

#[async_trait]
impl Prepare for Scripted {
    async fn prepare(&self, ctx: &ReleaseContext, _logger: &Logger) -> Result<()> {
        self.record(ExtensionPoint::Prepare, ctx, &[])?;
        if let Some(hook) = &self.on_prepare {
            hook();
        }
        Ok(())
    }
}

#[async_trait]
impl Publish for Scripted {
    async fn publish(
        &self,
        ctx: &ReleaseContext,
        _logger: &Logger,
    ) -> Result<Option<PublishedRelease>> {
        self.record(ExtensionPoint::Publish, ctx, &[])?;
        Ok(self.published.clone())
    }
}

#[async_trait]
impl Success for Scripted {
    async fn success(&self, ctx: &ReleaseContext, _logger: &Logger) -> Result<()> {
        self.record(ExtensionPoint::Success, ctx, &[])
    }
}

#[async_trait]
impl Fail for Scripted {
    async fn fail(
        &self,
        ctx: &ReleaseContext,
        errors: &[SemanticReleaseError],
        _logger: &Logger,
    ) -> Result<()> {
        self.record(ExtensionPoint::Fail, ctx, errors)
    }
}
