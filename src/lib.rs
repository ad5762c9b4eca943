//! # kodegen_semantic_release
//!
//! Automated release decisions for git repositories.
//!
//! Given the commits since the last release tag, the crate decides whether a new
//! version is warranted, computes it, generates release notes, and drives the
//! configured plugins through verification, preparation, tagging, publishing,
//! and notification.
//!
//! ## Features
//!
//! - **Plugin pipeline**: one capability trait per extension point, run either
//!   settle-all (every failure collected) or sequentially (first failure stops)
//! - **Branch model**: release, maintenance (`1.x`, `1.2.x`) and prerelease
//!   branches with channels and version ranges
//! - **Classified failures**: stable error codes forwarded to `fail` plugins
//! - **Dry runs**: compute and print the next release without side effects
//!
//! ## Usage
//!
//! ```bash
//! kodegen_semantic_release                 # Release from CI
//! kodegen_semantic_release --dry-run       # Preview the next release
//! kodegen_semantic_release --no-ci         # Release from a local checkout
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod branches;
pub mod ci;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod logger;
pub mod plugins;
pub mod release;
pub mod version;

pub use cli::Args;
pub use context::{ReleaseContext, ReleaseOptions};
pub use error::{ReleaseError, Result, SemanticReleaseError};
pub use git::{GitOperations, SystemGit};
pub use plugins::{ExtensionPoint, PluginRegistry};
pub use release::{RunOutcome, SemanticRelease, SkipReason};
