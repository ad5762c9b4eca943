//! CI environment detection.

use std::collections::HashMap;

/// What the CI service reports about the current build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiEnvironment {
    /// Running on a CI service
    pub is_ci: bool,
    /// Detected service name
    pub service: Option<String>,
    /// Branch being built, the target branch for pull requests
    pub branch: Option<String>,
    /// Build was triggered by a pull or merge request
    pub is_pr: bool,
}

impl CiEnvironment {
    /// Detect from the process environment
    pub fn detect() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Detect from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| env.get(key).map(String::as_str).filter(|v| !v.is_empty());

        if get("GITHUB_ACTIONS").is_some() {
            let is_pr = get("GITHUB_EVENT_NAME").is_some_and(|e| e.starts_with("pull_request"));
            let branch = if is_pr {
                get("GITHUB_BASE_REF").map(str::to_string)
            } else {
                get("GITHUB_REF").map(|r| r.strip_prefix("refs/heads/").unwrap_or(r).to_string())
            };
            return Self {
                is_ci: true,
                service: Some("github".to_string()),
                branch,
                is_pr,
            };
        }

        if get("GITLAB_CI").is_some() {
            let is_pr = get("CI_MERGE_REQUEST_ID").is_some();
            let branch = if is_pr {
                get("CI_MERGE_REQUEST_TARGET_BRANCH_NAME")
            } else {
                get("CI_COMMIT_REF_NAME")
            };
            return Self {
                is_ci: true,
                service: Some("gitlab".to_string()),
                branch: branch.map(str::to_string),
                is_pr,
            };
        }

        let is_ci = get("CI").is_some_and(|v| v != "false" && v != "0");
        Self {
            is_ci,
            service: None,
            branch: get("CI_BRANCH")
                .or_else(|| get("BRANCH_NAME"))
                .map(str::to_string),
            is_pr: get("CI_PULL_REQUEST").is_some_and(|v| v != "false"),
        }
    }
}
