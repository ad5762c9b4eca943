//! Version management for releases.
//!
//! This module provides tag name rendering and parsing, last release selection,
//! and semantic version bumping from a release type.

mod bump;
mod tag_format;

pub use bump::{increment, last_release, next_version};
pub use tag_format::{DEFAULT_TAG_FORMAT, TagFormat};
