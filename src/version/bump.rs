//! Semantic version bumping and last release selection.

use crate::branches::{BranchDescriptor, BranchKind};
use crate::context::{LastRelease, ReleaseType};
use crate::error::{Result, SemanticReleaseError, codes};
use semver::{Prerelease, Version};

/// Version of the first release on a branch without history
const FIRST_RELEASE: Version = Version::new(1, 0, 0);

/// Apply `release_type` to `version`.
///
/// A prerelease version is promoted rather than bumped when it already has the
/// shape the bump would produce, so `2.0.0-beta.3` + major is `2.0.0`.
pub fn increment(version: &Version, release_type: ReleaseType) -> Version {
    let promoted = !version.pre.is_empty();
    let (major, minor, patch) = (version.major, version.minor, version.patch);

    let (major, minor, patch) = match release_type {
        ReleaseType::Major if promoted && minor == 0 && patch == 0 => (major, 0, 0),
        ReleaseType::Major => (major + 1, 0, 0),
        ReleaseType::Minor if promoted && patch == 0 => (major, minor, 0),
        ReleaseType::Minor => (major, minor + 1, 0),
        ReleaseType::Patch if promoted => (major, minor, patch),
        ReleaseType::Patch => (major, minor, patch + 1),
    };
    Version::new(major, minor, patch)
}

/// Most recent release on `branch`, based on the tags reachable from it
pub fn last_release(branch: &BranchDescriptor) -> Option<LastRelease> {
    branch
        .tags
        .iter()
        .filter(|tag| match branch.prerelease.as_deref() {
            Some(id) => tag.version.pre.is_empty() || prerelease_id(&tag.version) == Some(id),
            None => {
                tag.version.pre.is_empty()
                    && branch.range.as_ref().is_none_or(|range| range.matches(&tag.version))
            }
        })
        .max_by(|a, b| a.version.cmp(&b.version))
        .map(|tag| LastRelease {
            version: tag.version.clone(),
            git_head: tag.git_head.clone(),
            git_tag: tag.name.clone(),
            channel: branch.channel.clone(),
        })
}

/// Version following `last` on `branch` for a `release_type` bump.
///
/// Fails with `EINVALIDNEXTVERSION` when the result falls outside the branch range.
pub fn next_version(
    last: Option<&LastRelease>,
    release_type: ReleaseType,
    branch: &BranchDescriptor,
) -> Result<Version> {
    let version = match (branch.prerelease.as_deref(), last) {
        (None, None) => FIRST_RELEASE,
        (None, Some(last)) => increment(&last.version, release_type),
        (Some(id), None) => with_prerelease(FIRST_RELEASE, id, 1)?,
        (Some(id), Some(last)) if prerelease_id(&last.version) == Some(id) => {
            let counter = prerelease_counter(&last.version).unwrap_or(0);
            let continued = with_prerelease(
                Version::new(last.version.major, last.version.minor, last.version.patch),
                id,
                counter + 1,
            )?;
            let rebased = match latest_stable(branch) {
                Some(stable) => Some(with_prerelease(increment(stable, release_type), id, 1)?),
                None => None,
            };
            match rebased {
                Some(rebased) if rebased > continued => rebased,
                _ => continued,
            }
        }
        (Some(id), Some(last)) => with_prerelease(increment(&last.version, release_type), id, 1)?,
    };

    if branch.kind != BranchKind::Prerelease
        && let Some(range) = &branch.range
        && !range.matches(&version)
    {
        return Err(SemanticReleaseError::new(
            codes::EINVALIDNEXTVERSION,
            format!(
                "The release `{version}` on branch `{}` cannot be published as it is out of range.",
                branch.name
            ),
        )
        .with_details(format!(
            "Based on the releases published on other branches, only versions within the \
             range `{range}` can be published from branch `{}`.\n\n\
             The commits that would trigger a `{release_type}` release should be moved to a \
             branch accepting that range, or the release type should be lowered.",
            branch.name
        ))
        .into());
    }

    Ok(version)
}

fn latest_stable(branch: &BranchDescriptor) -> Option<&Version> {
    branch
        .tags
        .iter()
        .map(|tag| &tag.version)
        .filter(|version| version.pre.is_empty())
        .max()
}

fn prerelease_id(version: &Version) -> Option<&str> {
    version.pre.as_str().split('.').next().filter(|id| !id.is_empty())
}

fn prerelease_counter(version: &Version) -> Option<u64> {
    version.pre.as_str().split('.').nth(1)?.parse().ok()
}

fn with_prerelease(mut version: Version, id: &str, counter: u64) -> Result<Version> {
    version.pre = Prerelease::new(&format!("{id}.{counter}"))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branches::ReleaseTag;
    use semver::VersionReq;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn tag(version: &str) -> ReleaseTag {
        ReleaseTag {
            name: format!("v{version}"),
            version: v(version),
            git_head: format!("sha-{version}"),
        }
    }

    fn branch(kind: BranchKind, prerelease: Option<&str>, range: Option<&str>, tags: &[&str]) -> BranchDescriptor {
        BranchDescriptor {
            name: "main".to_string(),
            kind,
            channel: None,
            range: range.map(|r| VersionReq::parse(r).unwrap()),
            prerelease: prerelease.map(str::to_string),
            tags: tags.iter().map(|t| tag(t)).collect(),
        }
    }

    #[test]
    fn test_increment() {
        assert_eq!(increment(&v("1.2.3"), ReleaseType::Patch), v("1.2.4"));
        assert_eq!(increment(&v("1.2.3"), ReleaseType::Minor), v("1.3.0"));
        assert_eq!(increment(&v("1.2.3"), ReleaseType::Major), v("2.0.0"));
        assert_eq!(increment(&v("2.0.0-beta.3"), ReleaseType::Major), v("2.0.0"));
        assert_eq!(increment(&v("1.3.0-beta.1"), ReleaseType::Major), v("2.0.0"));
    }

    #[test]
    fn test_first_release() {
        let main = branch(BranchKind::Release, None, None, &[]);
        assert_eq!(next_version(None, ReleaseType::Minor, &main).unwrap(), v("1.0.0"));

        let beta = branch(BranchKind::Prerelease, Some("beta"), None, &[]);
        assert_eq!(next_version(None, ReleaseType::Patch, &beta).unwrap(), v("1.0.0-beta.1"));
    }

    #[test]
    fn test_last_release_picks_highest_in_range() {
        let main = branch(
            BranchKind::Release,
            None,
            Some(">=1.2.0, <2.0.0"),
            &["1.0.0", "1.2.0", "2.0.0", "1.3.0-beta.1"],
        );
        let last = last_release(&main).unwrap();
        assert_eq!(last.version, v("1.2.0"));
        assert_eq!(last.git_tag, "v1.2.0");
        assert_eq!(last.git_head, "sha-1.2.0");
    }

    #[test]
    fn test_prerelease_counter_continues() {
        let beta = branch(BranchKind::Prerelease, Some("beta"), None, &["1.0.0", "2.0.0-beta.1"]);
        let last = last_release(&beta).unwrap();
        assert_eq!(last.version, v("2.0.0-beta.1"));
        assert_eq!(next_version(Some(&last), ReleaseType::Major, &beta).unwrap(), v("2.0.0-beta.2"));
    }

    #[test]
    fn test_prerelease_starts_from_stable() {
        let beta = branch(BranchKind::Prerelease, Some("beta"), None, &["1.0.0"]);
        let last = last_release(&beta).unwrap();
        assert_eq!(next_version(Some(&last), ReleaseType::Minor, &beta).unwrap(), v("1.1.0-beta.1"));
    }

    #[test]
    fn test_out_of_range_is_classified() {
        let maintenance = branch(BranchKind::Maintenance, None, Some(">=1.0.0, <2.0.0"), &["1.4.0"]);
        let last = last_release(&maintenance).unwrap();

        let error = next_version(Some(&last), ReleaseType::Major, &maintenance).unwrap_err();
        assert_eq!(error.code(), Some(codes::EINVALIDNEXTVERSION));
        assert_eq!(next_version(Some(&last), ReleaseType::Minor, &maintenance).unwrap(), v("1.5.0"));
    }
}
