//! Plugins shipped with the crate, resolved by configured name.

mod commit_analyzer;
mod conventional;
mod exec;
mod notes_generator;

pub use commit_analyzer::{CommitAnalyzer, ReleaseRule};
pub use exec::Exec;
pub use notes_generator::NotesGenerator;

use super::{ExtensionPoint, PluginRegistry};
use crate::config::PluginEntry;
use crate::error::{Result, SemanticReleaseError, codes};
use std::path::Path;
use std::sync::Arc;

/// Names accepted in the `plugins` list
pub const BUILTIN_PLUGINS: [&str; 3] = ["commit-analyzer", "release-notes-generator", "exec"];

/// Build the registry for `entries`, in order.
///
/// Unknown names fail with `EPLUGINNOTFOUND`. `cwd` is where `exec` runs its
/// commands.
pub fn resolve(entries: &[PluginEntry], cwd: &Path) -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();

    for entry in entries {
        match entry.name() {
            "commit-analyzer" => {
                let analyzer = CommitAnalyzer::from_options(entry.options())?;
                registry = registry.with_analyze_commits(Arc::new(analyzer));
            }
            "release-notes-generator" => {
                registry = registry.with_generate_notes(Arc::new(NotesGenerator::new()));
            }
            "exec" => {
                let exec = Arc::new(Exec::from_options(entry.options(), cwd.to_path_buf())?);
                registry = register_exec(registry, exec);
            }
            unknown => {
                return Err(SemanticReleaseError::new(
                    codes::EPLUGINNOTFOUND,
                    format!("A plugin configured in the step is not a valid plugin: `{unknown}`."),
                )
                .with_details(format!(
                    "Available plugins are `{}`.",
                    BUILTIN_PLUGINS.join("`, `")
                ))
                .into());
            }
        }
    }

    log::debug!("Resolved plugins: {:?}", registry);
    Ok(registry)
}

fn register_exec(mut registry: PluginRegistry, exec: Arc<Exec>) -> PluginRegistry {
    for point in ExtensionPoint::ALL {
        if !exec.handles(point) {
            continue;
        }
        let plugin = Arc::clone(&exec);
        registry = match point {
            ExtensionPoint::VerifyConditions => registry.with_verify_conditions(plugin),
            ExtensionPoint::AnalyzeCommits => registry.with_analyze_commits(plugin),
            ExtensionPoint::VerifyRelease => registry.with_verify_release(plugin),
            ExtensionPoint::GenerateNotes => registry.with_generate_notes(plugin),
            ExtensionPoint::Prepare => registry.with_prepare(plugin),
            ExtensionPoint::Publish => registry.with_publish(plugin),
            ExtensionPoint::Success => registry.with_success(plugin),
            ExtensionPoint::Fail => registry.with_fail(plugin),
        };
    }
    registry
}
