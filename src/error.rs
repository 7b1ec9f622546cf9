//! Error types for module resolution.
//!
//! Only [`FetchError::NotFound`] is recovered inside the resolver, where it
//! advances the resolve-or-fetch state machine. Every other variant is
//! surfaced to the caller with enough context (captured stderr, offending
//! path) to diagnose the failure without re-running it.

use camino::Utf8PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while resolving or fetching a module.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The module is not present in the cache.
    #[error("module {module} not found in module cache")]
    NotFound {
        /// The requested module reference.
        module: String,
    },

    /// A module reference or path was rejected before touching the cache.
    #[error("invalid module path {path}: {reason}")]
    InvalidPath {
        /// The rejected input.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The acquisition command exited unsuccessfully.
    #[error("{command} failed ({status}): {}", String::from_utf8_lossy(.stderr).trim())]
    SubprocessFailure {
        /// The command line that was run.
        command: String,
        /// Exit status reported by the process.
        status: ExitStatus,
        /// Captured standard error, verbatim.
        stderr: Vec<u8>,
    },

    /// The acquisition command could not be started.
    #[error("failed to run {command}")]
    CommandSpawn {
        /// The command line that was attempted.
        command: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The acquisition command exceeded its configured timeout.
    #[error("{command} timed out after {limit:?}")]
    Timeout {
        /// The command line that was killed.
        command: String,
        /// The timeout that elapsed.
        limit: Duration,
    },

    /// A module manifest could not be loaded or rewritten.
    #[error("manifest error in {dir}: {reason}")]
    Manifest {
        /// The module directory holding the manifest.
        dir: Utf8PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// A filesystem operation failed for a reason other than absence.
    #[error("I/O error: {context}")]
    Io {
        /// What was being attempted.
        context: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("invalid configuration at {path}: {reason}")]
    ConfigInvalid {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// No module cache root could be determined from flags, config or
    /// environment.
    #[error("could not determine the module cache directory; set GOMODCACHE or pass --cache-dir")]
    CacheRootUnavailable,

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FetchError>;

impl FetchError {
    /// Create a [`FetchError::NotFound`] for a module reference.
    #[must_use]
    pub fn not_found(module: impl Into<String>) -> Self {
        Self::NotFound {
            module: module.into(),
        }
    }

    /// Create a [`FetchError::Io`] with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a [`FetchError::Manifest`] for a module directory.
    #[must_use]
    pub fn manifest(dir: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::Manifest {
            dir: dir.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for the recoverable cache-miss case.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Clone for FetchError {
    fn clone(&self) -> Self {
        match self {
            Self::NotFound { module } => Self::NotFound {
                module: module.clone(),
            },
            Self::InvalidPath { path, reason } => Self::InvalidPath {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::SubprocessFailure {
                command,
                status,
                stderr,
            } => Self::SubprocessFailure {
                command: command.clone(),
                status: *status,
                stderr: stderr.clone(),
            },
            Self::CommandSpawn { command, source } => Self::CommandSpawn {
                command: command.clone(),
                source: clone_io_error(source),
            },
            Self::Timeout { command, limit } => Self::Timeout {
                command: command.clone(),
                limit: *limit,
            },
            Self::Manifest { dir, reason } => Self::Manifest {
                dir: dir.clone(),
                reason: reason.clone(),
            },
            Self::Io { context, source } => Self::Io {
                context: context.clone(),
                source: clone_io_error(source),
            },
            Self::ConfigInvalid { path, reason } => Self::ConfigInvalid {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::CacheRootUnavailable => Self::CacheRootUnavailable,
            #[cfg(any(test, feature = "test-support"))]
            Self::StubMismatch { message } => Self::StubMismatch {
                message: message.clone(),
            },
        }
    }
}

fn clone_io_error(source: &std::io::Error) -> std::io::Error {
    std::io::Error::new(source.kind(), source.to_string())
}
