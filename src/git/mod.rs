//! Git access for release runs.
//!
//! The orchestrator only talks to git through [`GitOperations`]; [`SystemGit`]
//! implements it over the system `git` binary.

mod operations;
mod system_git;

pub use operations::{GitOperations, TagInfo};
pub use system_git::SystemGit;
