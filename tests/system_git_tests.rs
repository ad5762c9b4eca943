#[cfg(test)]
mod tests {
    use kodegen_semantic_release::{GitOperations, SystemGit};
    use std::path::Path;
    use std::process::Command;

    fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .env("GIT_AUTHOR_NAME", "Ada")
            .env("GIT_AUTHOR_EMAIL", "ada@example.com")
            .env("GIT_COMMITTER_NAME", "Ada")
            .env("GIT_COMMITTER_EMAIL", "ada@example.com")
            .output()
            .expect("git runs");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Repository on `main` with `v1.0.0` on the first commit and one commit after it
    fn repository() -> Option<(tempfile::TempDir, String, String)> {
        which::which("git").ok()?;
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path();
        git(path, &["init", "--quiet"]);
        git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(path, &["commit", "--quiet", "--allow-empty", "-m", "chore: init"]);
        let first = git(path, &["rev-parse", "HEAD"]);
        git(path, &["tag", "-a", "v1.0.0", "-m", "v1.0.0"]);
        git(
            path,
            &["commit", "--quiet", "--allow-empty", "-m", "feat: second\n\nWith a body"],
        );
        let second = git(path, &["rev-parse", "HEAD"]);
        Some((dir, first, second))
    }

    #[tokio::test]
    async fn test_reads_branch_tags_and_history() {
        let Some((dir, first, second)) = repository() else {
            eprintln!("git is not installed, skipping");
            return;
        };
        let backend = SystemGit::new(dir.path()).unwrap();

        assert!(backend.is_repository().await.unwrap());
        assert!(!backend.is_shallow().await.unwrap());
        assert_eq!(backend.head().await.unwrap(), second);
        assert_eq!(backend.current_branch().await.unwrap().as_deref(), Some("main"));
        assert_eq!(backend.remote_url().await.unwrap(), None);

        let tags = backend.tags("main").await.unwrap().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "v1.0.0");
        // annotated tags resolve to the tagged commit
        assert_eq!(tags[0].target_commit, first);
        assert_eq!(backend.tags("missing").await.unwrap(), None);

        let commits = backend.commits_since(Some(first.as_str())).await.unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, second);
        assert_eq!(commits[0].subject(), "feat: second");
        assert_eq!(commits[0].author_email, "ada@example.com");

        assert_eq!(backend.commits_since(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_tag_creates_lightweight_tag_at_head() {
        let Some((dir, _, second)) = repository() else {
            eprintln!("git is not installed, skipping");
            return;
        };
        let backend = SystemGit::new(dir.path()).unwrap();

        backend.tag("v1.1.0", &second).await.unwrap();

        let tags = backend.tags("main").await.unwrap().unwrap();
        let created = tags.iter().find(|tag| tag.name == "v1.1.0").unwrap();
        assert_eq!(created.target_commit, second);
    }

    #[tokio::test]
    async fn test_outside_repository() {
        let Ok(_) = which::which("git") else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let backend = SystemGit::new(dir.path()).unwrap();

        assert!(!backend.is_repository().await.unwrap());
        assert_eq!(backend.current_branch().await.unwrap(), None);
    }
}
