//! The resolve-or-fetch protocol.
//!
//! [`Resolver::get`] guarantees a module version is present in the local
//! module cache and reports whether it is class-type:
//!
//! 1. Check the cache. A hit is classified and returned without running
//!    anything.
//! 2. On a miss, run the acquisition command.
//! 3. Parse its report. When it names the requested module, classify the
//!    reported directory directly.
//! 4. Otherwise check the cache once more, since the command may have
//!    populated it without saying so.
//!
//! Only [`FetchError::NotFound`] moves the protocol from one step to the
//! next; every other error is returned as soon as it happens.

use crate::acquire::{Acquisition, AcquisitionRunner, CommandExecutor};
use crate::cache::CacheLocator;
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::manifest::{ManifestAdapter, ManifestLoader, ToolEnv};
use crate::module::{ModuleReference, Resolution, ResolvedModule};
use crate::report::reports;
use log::debug;
use std::io::{self, Write};

/// Prefix for progress lines echoed to the caller.
pub const PROGRESS_PREFIX: &str = "modfetch:";

/// Options for [`Resolver::get`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Skip the initial cache check and always run the acquisition command.
    pub no_cache: bool,
}

/// Resolves module references against the cache, fetching on a miss.
///
/// The resolver holds shared references only and keeps no state between
/// calls, so one instance can serve many resolutions.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    config: &'a FetchConfig,
    executor: &'a dyn CommandExecutor,
    loader: &'a dyn ManifestLoader,
}

impl<'a> Resolver<'a> {
    /// Create a resolver.
    #[must_use]
    pub const fn new(
        config: &'a FetchConfig,
        executor: &'a dyn CommandExecutor,
        loader: &'a dyn ManifestLoader,
    ) -> Self {
        Self {
            config,
            executor,
            loader,
        }
    }

    /// Resolve `reference` from the cache alone, never running the
    /// acquisition command.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] on a cache miss, or the lookup or
    /// classification error.
    pub fn locate(
        &self,
        reference: &ModuleReference,
        env: Option<&ToolEnv>,
    ) -> Result<ResolvedModule> {
        self.check_cache(reference, env, Resolution::Cached)
    }

    /// Resolve `reference`, fetching it when the cache misses.
    ///
    /// `downloading` lines from the acquisition command are echoed to
    /// `progress` as `modfetch: downloading <path> <version>`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::NotFound`] when the module is still absent
    /// after acquisition, except that a nonzero exit under the
    /// try-parse-anyway policy surfaces as [`FetchError::SubprocessFailure`]
    /// carrying the command's stderr. Lookup, acquisition and manifest
    /// errors are returned unchanged.
    pub fn get(
        &self,
        reference: &ModuleReference,
        env: Option<&ToolEnv>,
        options: GetOptions,
        progress: &mut dyn Write,
    ) -> Result<ResolvedModule> {
        if options.no_cache {
            debug!("skipping cache check for {reference}");
        } else {
            match self.check_cache(reference, env, Resolution::Cached) {
                Err(e) if e.is_not_found() => debug!("{reference} not cached"),
                resolved => return resolved,
            }
        }

        let acquisition = AcquisitionRunner::new(self.config, self.executor).run(reference)?;

        match self.resolve_reported(reference, env, &acquisition, progress) {
            Err(e) if e.is_not_found() => debug!("report did not resolve {reference}"),
            resolved => return resolved,
        }

        // A query such as `@latest` never names a cache directory; after
        // acquisition the highest cached version is the answer.
        let recheck = if reference.has_version() && !reference.is_pinned() {
            reference.without_version()
        } else {
            reference.clone()
        };

        match self.check_cache(&recheck, env, Resolution::Rechecked) {
            Err(e) if e.is_not_found() && !acquisition.succeeded() => {
                Err(acquisition.into_failure())
            }
            resolved => resolved,
        }
    }

    fn locator(&self) -> CacheLocator<'a> {
        CacheLocator::new(self.config.cache_root())
    }

    fn check_cache(
        &self,
        reference: &ModuleReference,
        env: Option<&ToolEnv>,
        resolution: Resolution,
    ) -> Result<ResolvedModule> {
        let hit = self.locator().locate(reference)?;
        let is_class_type = ManifestAdapter::new(self.loader).classify(&hit.dir, env)?;
        debug!("resolved {reference} to {} ({})", hit.dir, resolution.as_str());
        Ok(ResolvedModule::new(
            reference.path(),
            hit.version,
            is_class_type,
            hit.dir,
            resolution,
        ))
    }

    fn resolve_reported(
        &self,
        reference: &ModuleReference,
        env: Option<&ToolEnv>,
        acquisition: &Acquisition,
        progress: &mut dyn Write,
    ) -> Result<ResolvedModule> {
        let diagnostics = acquisition.diagnostics();
        let mut matched = None;

        for report in reports(&diagnostics) {
            if let Some(line) = report.progress {
                write_progress(progress, line);
            }
            if matched.is_none() && satisfies(reference, &report.module) {
                matched = Some(report.module);
            }
        }

        let Some(module) = matched else {
            return Err(FetchError::not_found(reference.to_string()));
        };
        let Some(version) = module.version() else {
            return Err(FetchError::not_found(reference.to_string()));
        };

        let dir = self.locator().module_dir(module.path(), version)?;
        match dir.metadata() {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(FetchError::not_found(module.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("reported {module} but {dir} does not exist");
                return Err(FetchError::not_found(module.to_string()));
            }
            Err(e) => return Err(FetchError::io(format!("inspecting reported {dir}"), e)),
        }

        let is_class_type = ManifestAdapter::new(self.loader).classify(&dir, env)?;
        debug!("resolved {reference} to {dir} (reported)");
        Ok(ResolvedModule::new(
            module.path(),
            version,
            is_class_type,
            dir,
            Resolution::Reported,
        ))
    }
}

/// Whether a reported module answers the request: same path, and the same
/// version when a concrete one was requested.
fn satisfies(requested: &ModuleReference, reported: &ModuleReference) -> bool {
    requested.path() == reported.path()
        && (!requested.is_pinned() || requested.version() == reported.version())
}

fn write_progress(progress: &mut dyn Write, line: &str) {
    if writeln!(progress, "{PROGRESS_PREFIX} {line}").is_err() {
        // Best-effort progress; ignore write failures.
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
