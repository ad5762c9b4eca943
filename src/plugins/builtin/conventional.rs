//! Conventional commit header parsing shared by the analyzer and notes generator.

use crate::context::Commit;
use regex::Regex;
use std::sync::LazyLock;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[A-Za-z]+)(?:\((?P<scope>[^()]*)\))?(?P<breaking>!)?:\s+(?P<subject>.+)$")
        .expect("static regex is valid")
});

static BREAKING_NOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^BREAKING[ -]CHANGE:\s*(?P<note>.*)$").expect("static regex is valid")
});

/// A commit message split into its conventional parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConventionalCommit {
    pub kind: String,
    pub scope: Option<String>,
    pub subject: String,
    pub breaking: bool,
    pub breaking_note: Option<String>,
}

/// Parse `commit`, `None` when the header is not conventional
pub(crate) fn parse(commit: &Commit) -> Option<ConventionalCommit> {
    let captures = HEADER.captures(commit.subject().trim())?;
    let note = BREAKING_NOTE
        .captures(&commit.message)
        .map(|c| c["note"].trim().to_string());

    Some(ConventionalCommit {
        kind: captures["type"].to_ascii_lowercase(),
        scope: captures
            .name("scope")
            .map(|s| s.as_str().trim().to_string())
            .filter(|s| !s.is_empty()),
        subject: captures["subject"].trim().to_string(),
        breaking: captures.name("breaking").is_some() || note.is_some(),
        breaking_note: note.filter(|n| !n.is_empty()),
    })
}
