//! Module manifest classification and canonicalisation.
//!
//! A cached module is *class-type* when its manifest declares a class
//! entry point (a `project` directive in `gop.mod`). Class-type modules need
//! their `go.mod` rewritten into canonical form for the tool environment
//! using them, which means briefly writing into a read-only cache directory.
//!
//! [`ManifestAdapter`] owns that decision. Loading and rewriting the files
//! themselves sits behind [`ManifestLoader`] and [`ManifestDescriptor`]; the
//! filesystem implementation is [`crate::gomod::FsManifestLoader`].

use crate::error::Result;
use crate::permissions::WritableDir;
use camino::Utf8Path;
use log::debug;

/// Runtime module class-type modules depend on by default.
pub const DEFAULT_RUNTIME_MODULE: &str = "github.com/goplus/gop";

/// The tool environment a module is being prepared for.
///
/// Its presence is what allows [`ManifestAdapter::classify`] to rewrite
/// manifests; without one, classification is strictly read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEnv {
    runtime_module: String,
    runtime_version: String,
}

impl ToolEnv {
    /// An environment requiring `runtime_module` at `runtime_version`.
    #[must_use]
    pub fn new(runtime_module: impl Into<String>, runtime_version: impl Into<String>) -> Self {
        Self {
            runtime_module: runtime_module.into(),
            runtime_version: runtime_version.into(),
        }
    }

    /// An environment for [`DEFAULT_RUNTIME_MODULE`] at `runtime_version`.
    #[must_use]
    pub fn with_default_runtime(runtime_version: impl Into<String>) -> Self {
        Self::new(DEFAULT_RUNTIME_MODULE, runtime_version)
    }

    /// The runtime module path.
    #[must_use]
    pub fn runtime_module(&self) -> &str {
        &self.runtime_module
    }

    /// The required runtime version.
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }
}

/// How much of a module's manifest to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// `go.mod` and the class manifest.
    Full,
    /// Only the legacy `go.mod`. A manifest loaded this way cannot report a
    /// class entry point and refuses to be rewritten.
    Legacy,
}

/// A loaded module manifest.
#[cfg_attr(test, mockall::automock)]
pub trait ManifestDescriptor {
    /// Whether the manifest declares a class-type entry point.
    fn is_class_type(&self) -> bool;

    /// Whether the on-disk manifest is already canonical for `env`.
    fn is_canonical(&self, env: &ToolEnv) -> bool;

    /// Rewrite the on-disk manifest into canonical form for `env`, adding
    /// missing entries when `create_if_absent` is set.
    ///
    /// The caller is responsible for making the directory writable.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FetchError::Manifest`] when the manifest
    /// cannot be rewritten.
    fn update_canonical_form(&self, env: &ToolEnv, create_if_absent: bool) -> Result<()>;
}

/// Loads manifests from module directories.
#[cfg_attr(test, mockall::automock)]
pub trait ManifestLoader {
    /// Load the manifest in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FetchError::Manifest`] when the manifest is
    /// unreadable or malformed.
    fn load(&self, dir: &Utf8Path, mode: LoadMode) -> Result<Box<dyn ManifestDescriptor>>;
}

/// Classifies cached modules, canonicalising their manifests when a tool
/// environment is supplied.
#[derive(Clone, Copy)]
pub struct ManifestAdapter<'a> {
    loader: &'a dyn ManifestLoader,
}

impl<'a> ManifestAdapter<'a> {
    /// Create an adapter over `loader`.
    #[must_use]
    pub const fn new(loader: &'a dyn ManifestLoader) -> Self {
        Self { loader }
    }

    /// Report whether the module in `dir` is class-type.
    ///
    /// Without `env` the manifest is loaded in [`LoadMode::Legacy`] and
    /// nothing is written. With `env` the full manifest is loaded and, unless
    /// it is already canonical, rewritten while a [`WritableDir`] guard holds
    /// the directory writable. The guard restores the directory's previous
    /// permissions whether or not the rewrite succeeds.
    ///
    /// # Errors
    ///
    /// Returns the loader's error, a [`crate::error::FetchError::Io`] when
    /// the permissions cannot be changed, or the rewrite's error.
    pub fn classify(&self, dir: &Utf8Path, env: Option<&ToolEnv>) -> Result<bool> {
        let Some(tool_env) = env else {
            let legacy = self.loader.load(dir, LoadMode::Legacy)?;
            return Ok(legacy.is_class_type());
        };

        let manifest = self.loader.load(dir, LoadMode::Full)?;
        let is_class_type = manifest.is_class_type();

        if manifest.is_canonical(tool_env) {
            debug!("manifest in {dir} already canonical");
            return Ok(is_class_type);
        }

        debug!("canonicalising manifest in {dir}");
        let _writable = WritableDir::acquire(dir)?;
        manifest.update_canonical_form(tool_env, true)?;
        Ok(is_class_type)
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
