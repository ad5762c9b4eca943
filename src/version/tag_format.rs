//! Tag name derivation from a handlebars template.

use crate::branches::ReleaseTag;
use crate::error::{Result, SemanticReleaseError, codes};
use crate::git::TagInfo;
use handlebars::Handlebars;
use semver::Version;

/// Tag format used when none is configured
pub const DEFAULT_TAG_FORMAT: &str = "v{{version}}";

const PLACEHOLDER: &str = "@@version@@";

/// Compiled tag format, e.g. `v{{version}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFormat {
    prefix: String,
    suffix: String,
}

impl TagFormat {
    /// Compile `template`.
    ///
    /// The template is rendered once with a placeholder version; it must reference
    /// `version` exactly once and produce a valid git tag name.
    pub fn new(template: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        let rendered = registry
            .render_template(template, &serde_json::json!({ "version": PLACEHOLDER }))
            .map_err(|e| {
                SemanticReleaseError::new(
                    codes::EINVALIDTAGFORMAT,
                    format!("Invalid tag_format \"{template}\""),
                )
                .with_details(format!("The template could not be rendered: {e}"))
            })?;

        if rendered.matches(PLACEHOLDER).count() != 1 {
            return Err(SemanticReleaseError::new(
                codes::ETAGNOVERSION,
                format!("The tag_format \"{template}\" must contain {{{{version}}}} exactly once"),
            )
            .with_details(
                "The tag name is derived from the version, so the template needs a single \
                 `{{version}}` reference. The default is `v{{version}}`.",
            )
            .into());
        }

        let (prefix, suffix) = rendered
            .split_once(PLACEHOLDER)
            .unwrap_or((rendered.as_str(), ""));
        let format = Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        };

        let sample = format.render(&Version::new(1, 0, 0));
        if !is_valid_tag_name(&sample) {
            return Err(SemanticReleaseError::new(
                codes::EINVALIDTAGFORMAT,
                format!("Invalid tag_format \"{template}\""),
            )
            .with_details(format!(
                "The template produces `{sample}`, which is not a valid git tag name."
            ))
            .into());
        }

        Ok(format)
    }

    /// Tag name for `version`
    pub fn render(&self, version: &Version) -> String {
        format!("{}{}{}", self.prefix, version, self.suffix)
    }

    /// Version encoded in `tag`, if the tag follows this format
    pub fn parse(&self, tag: &str) -> Option<Version> {
        let version = tag.strip_prefix(&self.prefix)?.strip_suffix(&self.suffix)?;
        Version::parse(version).ok()
    }

    /// Keep the tags that follow this format, sorted by ascending version
    pub fn normalize(&self, tags: &[TagInfo]) -> Vec<ReleaseTag> {
        let mut releases: Vec<ReleaseTag> = tags
            .iter()
            .filter_map(|tag| {
                self.parse(&tag.name).map(|version| ReleaseTag {
                    name: tag.name.clone(),
                    version,
                    git_head: tag.target_commit.clone(),
                })
            })
            .collect();
        releases.sort_by(|a, b| a.version.cmp(&b.version));
        releases
    }
}

/// Subset of `git check-ref-format` rules relevant to tag names
fn is_valid_tag_name(name: &str) -> bool {
    const FORBIDDEN: [char; 7] = ['~', '^', ':', '?', '*', '[', '\\'];

    !name.is_empty()
        && !name.chars().any(|c| c.is_whitespace() || c.is_control() || FORBIDDEN.contains(&c))
        && !name.contains("..")
        && !name.contains("@{")
        && !name.contains("//")
        && !name.starts_with(['-', '/', '.'])
        && !name.ends_with(['/', '.'])
        && !name.ends_with(".lock")
}
