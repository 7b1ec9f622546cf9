//! Scoped write access to read-only module directories.
//!
//! Module cache directories are kept read-only so nothing edits a module
//! behind the cache's back. [`WritableDir`] grants owner write access for the
//! lifetime of the guard and puts the captured permissions back when dropped,
//! on success, early return, error propagation and unwinding alike.

use crate::error::{FetchError, Result};
use camino::Utf8Path;
use log::{trace, warn};
use std::fs::{self, Permissions};

/// Guard holding a directory writable until dropped.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use modfetch::permissions::WritableDir;
///
/// let dir = Utf8Path::new("/cache/example.com/m@v1.0.0");
/// {
///     let _guard = WritableDir::acquire(dir)?;
///     std::fs::write(dir.join("go.mod"), "module example.com/m\n").ok();
/// }
/// // Original permissions are back in place here.
/// # Ok::<(), modfetch::error::FetchError>(())
/// ```
#[derive(Debug)]
pub struct WritableDir<'a> {
    dir: &'a Utf8Path,
    prior: Permissions,
}

impl<'a> WritableDir<'a> {
    /// Make `dir` writable, remembering its current permissions.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when the permissions cannot be read or
    /// changed. Nothing is changed in that case.
    pub fn acquire(dir: &'a Utf8Path) -> Result<Self> {
        let prior = fs::metadata(dir)
            .map_err(|e| FetchError::io(format!("reading permissions of {dir}"), e))?
            .permissions();

        fs::set_permissions(dir, writable(&prior))
            .map_err(|e| FetchError::io(format!("making {dir} writable"), e))?;
        trace!("made {dir} writable");

        Ok(Self { dir, prior })
    }

    /// The permissions that will be restored on drop.
    #[must_use]
    pub const fn prior_permissions(&self) -> &Permissions {
        &self.prior
    }
}

impl Drop for WritableDir<'_> {
    fn drop(&mut self) {
        match fs::set_permissions(self.dir, self.prior.clone()) {
            Ok(()) => trace!("restored permissions of {}", self.dir),
            Err(e) => warn!("failed to restore permissions of {}: {e}", self.dir),
        }
    }
}

#[cfg(unix)]
fn writable(prior: &Permissions) -> Permissions {
    use std::os::unix::fs::PermissionsExt;

    Permissions::from_mode(prior.mode() | 0o700)
}

#[cfg(not(unix))]
fn writable(prior: &Permissions) -> Permissions {
    let mut permissions = prior.clone();
    permissions.set_readonly(false);
    permissions
}
