//! Module path and version primitives shared by the modfetch crates.
//!
//! - [`escape`] maps module paths to the case-safe form used for module cache
//!   directory names, and back.
//! - [`version`] orders `v`-prefixed semantic version strings the way the
//!   module cache expects.

pub mod escape;
pub mod version;

pub use escape::{EscapeError, escape_path, unescape_path};
pub use version::{compare_versions, is_canonical_version, is_valid_version};
