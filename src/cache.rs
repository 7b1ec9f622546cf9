//! Module cache lookup.
//!
//! The module cache stores each module version in a directory named
//! `<escaped path>@<version>` below the cache root, so
//! `github.com/Azure/go@v1.2.0` lives in `<root>/github.com/!azure/go@v1.2.0`.
//! Directory existence is the only record of what is cached; there is no
//! index to fall out of date.

use crate::error::{FetchError, Result};
use crate::module::{ModuleReference, VERSION_SEPARATOR};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use modfetch_common::{compare_versions, escape_path, is_valid_version};
use std::cmp::Ordering;
use std::io;

/// A module version present in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    /// The module version's directory.
    pub dir: Utf8PathBuf,
    /// The concrete version.
    pub version: String,
}

/// Read-only view of a module cache root.
#[derive(Debug, Clone, Copy)]
pub struct CacheLocator<'a> {
    root: &'a Utf8Path,
}

impl<'a> CacheLocator<'a> {
    /// Create a locator for the cache at `root`.
    #[must_use]
    pub const fn new(root: &'a Utf8Path) -> Self {
        Self { root }
    }

    /// The cache root.
    #[must_use]
    pub const fn root(&self) -> &'a Utf8Path {
        self.root
    }

    /// Compute the directory a module version occupies, whether or not it
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPath`] when the module path cannot be
    /// escaped.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use modfetch::cache::CacheLocator;
    ///
    /// let locator = CacheLocator::new(Utf8Path::new("/cache"));
    /// let dir = locator.module_dir("github.com/Azure/go", "v1.2.0")?;
    /// assert_eq!(dir, "/cache/github.com/!azure/go@v1.2.0");
    /// # Ok::<(), modfetch::error::FetchError>(())
    /// ```
    pub fn module_dir(&self, path: &str, version: &str) -> Result<Utf8PathBuf> {
        let escaped = escape(path)?;
        Ok(self
            .root
            .join(format!("{escaped}{VERSION_SEPARATOR}{version}")))
    }

    /// Find a module in the cache.
    ///
    /// With an explicit version the module's directory must exist. Without
    /// one, the highest cached version wins; among versions of equal
    /// precedence (for example differing only in build metadata) the
    /// lexicographically greatest directory name is chosen, so the result
    /// never depends on directory listing order.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] on a cache miss,
    /// [`FetchError::InvalidPath`] for an unescapable path and
    /// [`FetchError::Io`] when the cache cannot be inspected.
    pub fn locate(&self, reference: &ModuleReference) -> Result<CacheHit> {
        match reference.version() {
            Some(version) => self.locate_exact(reference, version),
            None => self
                .list_versions(reference.path())?
                .pop()
                .ok_or_else(|| FetchError::not_found(reference.to_string())),
        }
    }

    /// List every cached version of a module, lowest first.
    ///
    /// Entries whose suffix is not a valid version are skipped, as are plain
    /// files. A missing parent directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPath`] for an unescapable path and
    /// [`FetchError::Io`] when the parent directory cannot be listed.
    pub fn list_versions(&self, path: &str) -> Result<Vec<CacheHit>> {
        let escaped = escape(path)?;
        let probe = self.root.join(format!("{escaped}{VERSION_SEPARATOR}"));
        let (Some(parent), Some(prefix)) = (probe.parent(), probe.file_name()) else {
            return Err(FetchError::InvalidPath {
                path: path.to_owned(),
                reason: "module path has no final element".to_owned(),
            });
        };

        debug!("scanning {parent} for {prefix}*");

        let entries = match parent.read_dir_utf8() {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FetchError::io(format!("listing {parent}"), e)),
        };

        let mut hits = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FetchError::io(format!("listing {parent}"), e))?;
            let Some(version) = entry.file_name().strip_prefix(prefix) else {
                continue;
            };
            if !is_valid_version(version) || !entry.path().is_dir() {
                trace!("skipping {}", entry.path());
                continue;
            }
            hits.push(CacheHit {
                dir: entry.path().to_owned(),
                version: version.to_owned(),
            });
        }

        hits.sort_by(compare_hits);
        Ok(hits)
    }

    fn locate_exact(&self, reference: &ModuleReference, version: &str) -> Result<CacheHit> {
        let dir = self.module_dir(reference.path(), version)?;
        debug!("probing {dir}");

        match dir.metadata() {
            Ok(meta) if meta.is_dir() => Ok(CacheHit {
                dir,
                version: version.to_owned(),
            }),
            Ok(_) => Err(FetchError::not_found(reference.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FetchError::not_found(reference.to_string()))
            }
            Err(e) => Err(FetchError::io(format!("inspecting {dir}"), e)),
        }
    }
}

fn compare_hits(a: &CacheHit, b: &CacheHit) -> Ordering {
    compare_versions(&a.version, &b.version).then_with(|| a.dir.cmp(&b.dir))
}

fn escape(path: &str) -> Result<String> {
    escape_path(path).map_err(|e| FetchError::InvalidPath {
        path: path.to_owned(),
        reason: e.to_string(),
    })
}
