//! Platform directory lookup behind a mockable trait.
//!
//! Cache-root and config-file discovery depend on the user's home and config
//! directories; routing them through [`BaseDirs`] keeps that logic testable
//! without touching the real home directory.

use std::path::PathBuf;

/// Source of the platform-specific base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// The modfetch configuration directory (for example
    /// `~/.config/modfetch` on Linux).
    fn modfetch_config_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
///
/// # Examples
///
/// ```no_run
/// use modfetch::dirs::{BaseDirs, SystemBaseDirs};
///
/// let dirs = SystemBaseDirs::new().expect("failed to initialise directories");
/// println!("{:?}", dirs.home_dir());
/// ```
#[derive(Debug, Clone)]
pub struct SystemBaseDirs {
    base: directories_next::BaseDirs,
}

impl SystemBaseDirs {
    /// Resolve the platform directories.
    ///
    /// Returns `None` when no home directory can be determined, as happens in
    /// some minimal containers.
    #[must_use]
    pub fn new() -> Option<Self> {
        directories_next::BaseDirs::new().map(|base| Self { base })
    }
}

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        Some(self.base.home_dir().to_path_buf())
    }

    fn modfetch_config_dir(&self) -> Option<PathBuf> {
        Some(self.base.config_dir().join("modfetch"))
    }
}
