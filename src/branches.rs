//! Release branch resolution.
//!
//! Turns the configured branches and the tag history reachable from each of them
//! into descriptors carrying the branch kind, release channel, and the range of
//! versions the branch may still publish.

use crate::error::{AggregateError, ReleaseError, Result, SemanticReleaseError, codes};
use regex::Regex;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static MAINTENANCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:\.(\d+))?\.x$").expect("static regex is valid"));

const MAX_RELEASE_BRANCHES: usize = 3;

/// Prerelease setting of a configured branch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Prerelease {
    /// `true` uses the branch name as identifier
    Enabled(bool),
    /// Explicit identifier
    Identifier(String),
}

/// A branch as configured by the user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "BranchEntry")]
pub struct BranchConfig {
    /// Branch name
    pub name: String,
    /// Release channel override
    pub channel: Option<String>,
    /// Explicit version range, marks a maintenance branch
    pub range: Option<String>,
    /// Prerelease setting
    pub prerelease: Option<Prerelease>,
}

impl BranchConfig {
    /// Branch with defaults for everything but the name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channel: None,
            range: None,
            prerelease: None,
        }
    }

    /// Prerelease branch using its name as identifier
    pub fn prerelease(name: impl Into<String>) -> Self {
        Self {
            prerelease: Some(Prerelease::Enabled(true)),
            ..Self::named(name)
        }
    }

    fn kind(&self) -> BranchKind {
        if self.range.is_some() || MAINTENANCE_NAME.is_match(&self.name) {
            BranchKind::Maintenance
        } else if matches!(
            self.prerelease,
            Some(Prerelease::Enabled(true)) | Some(Prerelease::Identifier(_))
        ) {
            BranchKind::Prerelease
        } else {
            BranchKind::Release
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BranchEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        channel: Option<String>,
        #[serde(default)]
        range: Option<String>,
        #[serde(default)]
        prerelease: Option<Prerelease>,
    },
}

impl From<BranchEntry> for BranchConfig {
    fn from(entry: BranchEntry) -> Self {
        match entry {
            BranchEntry::Name(name) => BranchConfig::named(name),
            BranchEntry::Detailed {
                name,
                channel,
                range,
                prerelease,
            } => BranchConfig {
                name,
                channel,
                range,
                prerelease,
            },
        }
    }
}

/// Role of a branch in the release flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    /// Fixes for an older major or minor line
    Maintenance,
    /// Regular releases
    Release,
    /// Prerelease versions
    Prerelease,
}

/// A release tag reachable from a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    /// Tag name
    pub name: String,
    /// Version parsed from the tag name
    pub version: Version,
    /// Commit the tag points at
    pub git_head: String,
}

/// A branch authorized to release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchDescriptor {
    /// Branch name
    pub name: String,
    /// Role of the branch
    pub kind: BranchKind,
    /// Release channel, `None` for the default channel
    pub channel: Option<String>,
    /// Versions the branch may publish, `None` for unbounded
    pub range: Option<VersionReq>,
    /// Prerelease identifier
    pub prerelease: Option<String>,
    /// Release tags reachable from the branch, ascending
    pub tags: Vec<ReleaseTag>,
}

/// Resolve configured branches against their tag history.
///
/// `tag_history` maps each branch that exists in the repository to the release
/// tags reachable from it; configured branches missing from it are ignored. The
/// result lists maintenance, release, and prerelease branches, each group in
/// configuration order.
pub fn resolve(
    configs: &[BranchConfig],
    tag_history: &BTreeMap<String, Vec<ReleaseTag>>,
) -> Result<Vec<BranchDescriptor>> {
    let mut seen = HashSet::new();
    let duplicates: Vec<&str> = configs
        .iter()
        .filter(|config| !seen.insert(config.name.as_str()))
        .map(|config| config.name.as_str())
        .collect();
    if !duplicates.is_empty() {
        return Err(SemanticReleaseError::new(
            codes::EDUPLICATEBRANCHES,
            "The branches configuration has duplicate branches.",
        )
        .with_details(format!(
            "Each branch may be listed once. Duplicates: `{}`.",
            duplicates.join("`, `")
        ))
        .into());
    }

    let existing: Vec<(&BranchConfig, &[ReleaseTag])> = configs
        .iter()
        .filter_map(|config| {
            tag_history
                .get(&config.name)
                .map(|tags| (config, tags.as_slice()))
        })
        .collect();
    let of_kind = |kind: BranchKind| {
        existing
            .iter()
            .filter(|(config, _)| config.kind() == kind)
            .copied()
            .collect::<Vec<_>>()
    };

    let releases = of_kind(BranchKind::Release);
    if releases.is_empty() {
        return Err(SemanticReleaseError::new(
            codes::ENORELEASEBRANCHES,
            "The branches configuration must contain at least one release branch.",
        )
        .with_details(
            "A release branch is any configured branch that is neither a maintenance \
             branch (`N.x`, `N.N.x` or with a `range`) nor a prerelease branch. \
             The branch must also exist in the repository.",
        )
        .into());
    }
    if releases.len() > MAX_RELEASE_BRANCHES {
        return Err(SemanticReleaseError::new(
            codes::ETOOMANYRELEASEBRANCHES,
            format!("The branches configuration must contain at most {MAX_RELEASE_BRANCHES} release branches."),
        )
        .with_details(format!(
            "Found {} release branches: `{}`.",
            releases.len(),
            releases
                .iter()
                .map(|(config, _)| config.name.as_str())
                .collect::<Vec<_>>()
                .join("`, `")
        ))
        .into());
    }

    let mut branches = Vec::with_capacity(existing.len());
    let mut errors = Vec::new();

    for (config, tags) in of_kind(BranchKind::Maintenance) {
        match maintenance_range(config, tags) {
            Ok(range) => branches.push(descriptor(
                config,
                BranchKind::Maintenance,
                Some(config.name.clone()),
                Some(range),
                None,
                tags,
            )),
            Err(error) => errors.push(error),
        }
    }

    for (index, (config, tags)) in releases.iter().enumerate() {
        let default_channel = if index == 0 { None } else { Some(config.name.clone()) };
        let range = release_range(tags, releases.get(index + 1).map(|(_, next)| *next))?;
        branches.push(descriptor(
            config,
            BranchKind::Release,
            default_channel,
            range,
            None,
            tags,
        ));
    }

    for (config, tags) in of_kind(BranchKind::Prerelease) {
        let id = match &config.prerelease {
            Some(Prerelease::Identifier(id)) => id.clone(),
            _ => config.name.clone(),
        };
        if semver::Prerelease::new(&format!("{id}.1")).is_err() {
            errors.push(
                SemanticReleaseError::new(
                    codes::EPRERELEASEBRANCH,
                    format!("The prerelease identifier of branch `{}` is invalid.", config.name),
                )
                .with_details(format!(
                    "`{id}` must be a valid semver prerelease identifier (alphanumerics and hyphens)."
                ))
                .into(),
            );
            continue;
        }
        branches.push(descriptor(
            config,
            BranchKind::Prerelease,
            Some(config.name.clone()),
            None,
            Some(id),
            tags,
        ));
    }

    match errors.len() {
        0 => Ok(branches),
        1 => Err(errors.remove(0)),
        _ => Err(AggregateError { point: None, errors }.into()),
    }
}

fn descriptor(
    config: &BranchConfig,
    kind: BranchKind,
    default_channel: Option<String>,
    range: Option<VersionReq>,
    prerelease: Option<String>,
    tags: &[ReleaseTag],
) -> BranchDescriptor {
    BranchDescriptor {
        name: config.name.clone(),
        kind,
        channel: config.channel.clone().or(default_channel),
        range,
        prerelease,
        tags: tags.to_vec(),
    }
}

fn highest_stable(tags: &[ReleaseTag]) -> Option<&Version> {
    tags.iter()
        .map(|tag| &tag.version)
        .filter(|version| version.pre.is_empty())
        .max()
}

fn maintenance_range(config: &BranchConfig, tags: &[ReleaseTag]) -> Result<VersionReq> {
    let invalid = |reason: String| -> ReleaseError {
        SemanticReleaseError::new(
            codes::EMAINTENANCEBRANCH,
            format!("The maintenance branch `{}` has an invalid range.", config.name),
        )
        .with_details(reason)
        .into()
    };

    let base = match &config.range {
        Some(range) => range.clone(),
        None => {
            let captures = MAINTENANCE_NAME
                .captures(&config.name)
                .ok_or_else(|| invalid(format!("`{}` is not of the form `N.x` or `N.N.x`.", config.name)))?;
            let major: u64 = captures[1]
                .parse()
                .map_err(|_| invalid(format!("`{}` has an unusable major version.", config.name)))?;
            match captures.get(2) {
                Some(minor) => {
                    let minor: u64 = minor.as_str().parse().map_err(|_| {
                        invalid(format!("`{}` has an unusable minor version.", config.name))
                    })?;
                    format!(">={major}.{minor}.0, <{major}.{}.0", minor + 1)
                }
                None => format!(">={major}.0.0, <{}.0.0", major + 1),
            }
        }
    };

    let base_req = VersionReq::parse(&base).map_err(|e| invalid(format!("`{base}`: {e}")))?;
    let released = tags
        .iter()
        .map(|tag| &tag.version)
        .filter(|version| version.pre.is_empty() && base_req.matches(version))
        .max();

    match released {
        Some(version) => VersionReq::parse(&format!("{base}, >={version}"))
            .map_err(|e| invalid(format!("`{base}`: {e}"))),
        None => Ok(base_req),
    }
}

fn release_range(tags: &[ReleaseTag], next: Option<&[ReleaseTag]>) -> Result<Option<VersionReq>> {
    let lower = highest_stable(tags);
    let upper = next.and_then(|next_tags| {
        next_tags
            .iter()
            .map(|tag| &tag.version)
            .filter(|version| version.pre.is_empty())
            .filter(|version| !tags.iter().any(|own| &own.version == *version))
            .min()
    });

    let range = match (lower, upper) {
        (Some(lower), Some(upper)) => format!(">={lower}, <{upper}"),
        (Some(lower), None) => format!(">={lower}"),
        (None, Some(upper)) => format!("<{upper}"),
        (None, None) => return Ok(None),
    };
    Ok(Some(VersionReq::parse(&range)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(versions: &[&str]) -> Vec<ReleaseTag> {
        versions
            .iter()
            .map(|v| ReleaseTag {
                name: format!("v{v}"),
                version: Version::parse(v).unwrap(),
                git_head: format!("sha-{v}"),
            })
            .collect()
    }

    fn history(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<ReleaseTag>> {
        entries
            .iter()
            .map(|(name, versions)| (name.to_string(), tags(versions)))
            .collect()
    }

    fn code_of(result: Result<Vec<BranchDescriptor>>) -> String {
        result.unwrap_err().code().unwrap_or_default().to_string()
    }

    #[test]
    fn test_default_branch_maps_to_default_channel() {
        let configs = vec![
            BranchConfig::named("master"),
            BranchConfig::named("main"),
            BranchConfig::named("next"),
            BranchConfig::prerelease("beta"),
        ];
        let history = history(&[
            ("main", &["1.0.0", "1.1.0"]),
            ("next", &["1.0.0", "1.1.0", "2.0.0"]),
            ("beta", &["1.0.0"]),
        ]);

        let branches = resolve(&configs, &history).unwrap();
        let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["main", "next", "beta"]);

        assert_eq!(branches[0].channel, None);
        assert_eq!(branches[0].range, Some(VersionReq::parse(">=1.1.0, <2.0.0").unwrap()));
        assert_eq!(branches[1].channel.as_deref(), Some("next"));
        assert_eq!(branches[1].range, Some(VersionReq::parse(">=2.0.0").unwrap()));
        assert_eq!(branches[2].kind, BranchKind::Prerelease);
        assert_eq!(branches[2].prerelease.as_deref(), Some("beta"));
        assert_eq!(branches[2].channel.as_deref(), Some("beta"));
    }

    #[test]
    fn test_maintenance_range_from_name_and_history() {
        let configs = vec![BranchConfig::named("1.x"), BranchConfig::named("main")];
        let history = history(&[("1.x", &["1.0.0", "1.4.2"]), ("main", &["1.4.2", "2.0.0"])]);

        let branches = resolve(&configs, &history).unwrap();
        assert_eq!(branches[0].kind, BranchKind::Maintenance);
        let range = branches[0].range.as_ref().unwrap();
        assert!(range.matches(&Version::new(1, 5, 0)));
        assert!(!range.matches(&Version::new(1, 4, 1)));
        assert!(!range.matches(&Version::new(2, 0, 0)));
        assert_eq!(branches[0].channel.as_deref(), Some("1.x"));
    }

    #[test]
    fn test_explicit_channel_wins() {
        let configs = vec![BranchConfig {
            channel: Some("stable".to_string()),
            ..BranchConfig::named("main")
        }];
        let branches = resolve(&configs, &history(&[("main", &[])])).unwrap();
        assert_eq!(branches[0].channel.as_deref(), Some("stable"));
        assert_eq!(branches[0].range, None);
    }

    #[test]
    fn test_validation_errors() {
        let only_prerelease = vec![BranchConfig::prerelease("beta")];
        assert_eq!(
            code_of(resolve(&only_prerelease, &history(&[("beta", &[])]))),
            codes::ENORELEASEBRANCHES
        );

        let duplicated = vec![BranchConfig::named("main"), BranchConfig::named("main")];
        assert_eq!(
            code_of(resolve(&duplicated, &history(&[("main", &[])]))),
            codes::EDUPLICATEBRANCHES
        );

        let many: Vec<BranchConfig> = ["a", "b", "c", "d"].into_iter().map(BranchConfig::named).collect();
        let all = history(&[("a", &[]), ("b", &[]), ("c", &[]), ("d", &[])]);
        assert_eq!(code_of(resolve(&many, &all)), codes::ETOOMANYRELEASEBRANCHES);
    }

    #[test]
    fn test_missing_branches_are_ignored() {
        let configs = vec![BranchConfig::named("master"), BranchConfig::named("main")];
        let branches = resolve(&configs, &history(&[("main", &["1.0.0"])])).unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "main");
        assert_eq!(branches[0].channel, None);
    }

    #[test]
    fn test_branch_config_deserializes_from_name_or_table() {
        #[derive(Deserialize)]
        struct Wrapper {
            branches: Vec<BranchConfig>,
        }
        let parsed: Wrapper = toml::from_str(
            r#"branches = ["main", { name = "beta", prerelease = true }, { name = "rc", prerelease = "pre" }]"#,
        )
        .unwrap();

        assert_eq!(parsed.branches[0], BranchConfig::named("main"));
        assert_eq!(parsed.branches[1], BranchConfig::prerelease("beta"));
        assert_eq!(
            parsed.branches[2].prerelease,
            Some(Prerelease::Identifier("pre".to_string()))
        );
    }
}
