//! Module references and resolution results.

use crate::error::{FetchError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use modfetch_common::is_canonical_version;
use std::fmt;
use std::str::FromStr;

/// Separator between a module path and its version, both in requests
/// (`golang.org/x/mod@v0.14.0`) and in module cache directory names.
pub const VERSION_SEPARATOR: char = '@';

/// A requested module: a path and an optional version.
///
/// # Examples
///
/// ```
/// use modfetch::module::ModuleReference;
///
/// let pinned: ModuleReference = "golang.org/x/mod@v0.14.0".parse()?;
/// assert_eq!(pinned.path(), "golang.org/x/mod");
/// assert_eq!(pinned.version(), Some("v0.14.0"));
///
/// let floating: ModuleReference = "golang.org/x/mod".parse()?;
/// assert_eq!(floating.version(), None);
/// # Ok::<(), modfetch::error::FetchError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleReference {
    path: String,
    version: Option<String>,
}

impl ModuleReference {
    /// Create a reference from its parts without validation.
    #[must_use]
    pub fn new(path: impl Into<String>, version: Option<String>) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    /// Parse `path[@version]`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPath`] when the path or version is empty,
    /// the separator appears more than once, or the version contains a path
    /// separator.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| FetchError::InvalidPath {
            path: input.to_owned(),
            reason: reason.to_owned(),
        };

        let (path, version) = match input.split_once(VERSION_SEPARATOR) {
            Some((path, version)) => (path, Some(version)),
            None => (input, None),
        };

        if path.is_empty() {
            return Err(invalid("empty module path"));
        }

        if let Some(requested) = version {
            if requested.is_empty() {
                return Err(invalid("empty version after `@`"));
            }
            if requested.contains(VERSION_SEPARATOR) {
                return Err(invalid("more than one `@` separator"));
            }
            if requested.contains(['/', '\\']) {
                return Err(invalid("version contains a path separator"));
            }
        }

        Ok(Self::new(path, version.map(str::to_owned)))
    }

    /// The module path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The requested version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Returns `true` when a version was requested explicitly.
    #[must_use]
    pub const fn has_version(&self) -> bool {
        self.version.is_some()
    }

    /// Returns `true` when the version is a full semantic version rather
    /// than a query such as `latest`, `master` or the shorthand `v1`.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.version().is_some_and(is_canonical_version)
    }

    /// Returns a copy with the version dropped.
    #[must_use]
    pub fn without_version(&self) -> Self {
        Self::new(self.path.clone(), None)
    }

    /// Returns a copy pinned to `version`.
    #[must_use]
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self::new(self.path.clone(), Some(version.into()))
    }
}

impl FromStr for ModuleReference {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}{VERSION_SEPARATOR}{version}", self.path),
            None => f.write_str(&self.path),
        }
    }
}

/// How a [`ResolvedModule`] was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Already present in the cache before any acquisition.
    Cached,
    /// Named by the acquisition command's report.
    Reported,
    /// Found by re-checking the cache after acquisition.
    Rechecked,
}

impl Resolution {
    /// Short lowercase label for output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Reported => "reported",
            Self::Rechecked => "rechecked",
        }
    }
}

/// A module confirmed to exist in the cache, with its manifest classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    path: String,
    version: String,
    is_class_type: bool,
    dir: Utf8PathBuf,
    resolution: Resolution,
}

impl ResolvedModule {
    pub(crate) fn new(
        path: impl Into<String>,
        version: impl Into<String>,
        is_class_type: bool,
        dir: Utf8PathBuf,
        resolution: Resolution,
    ) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
            is_class_type,
            dir,
            resolution,
        }
    }

    /// The module path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The concrete version found in the cache.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether the module's manifest declares a class-type entry point.
    #[must_use]
    pub const fn is_class_type(&self) -> bool {
        self.is_class_type
    }

    /// The module's cache directory.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// How the module was found.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The pinned reference for this module.
    #[must_use]
    pub fn reference(&self) -> ModuleReference {
        ModuleReference::new(self.path.clone(), Some(self.version.clone()))
    }
}
