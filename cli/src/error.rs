//! Error type for the command-line front end.

use modfetch::FetchError;
use thiserror::Error;

/// Exit status for a module that `locate` could not find in the cache.
pub const EXIT_NOT_CACHED: i32 = 2;

/// Exit status for every other failure.
pub const EXIT_FAILURE: i32 = 1;

/// Errors reported by `modfetch` subcommands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Resolution, configuration or acquisition failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// `locate` found no matching version in the cache.
    #[error("{module} is not in the module cache at {cache_root}")]
    NotCached {
        /// The requested module reference.
        module: String,
        /// The cache root that was searched.
        cache_root: String,
    },

    /// Writing results to stdout failed.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    /// The process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NotCached { .. } => EXIT_NOT_CACHED,
            Self::Fetch(_) | Self::WriteFailed { .. } => EXIT_FAILURE,
        }
    }
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_cached_exits_with_two() {
        let err = CliError::NotCached {
            module: "example.com/mod".to_owned(),
            cache_root: "/cache".to_owned(),
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            "example.com/mod is not in the module cache at /cache"
        );
    }

    #[test]
    fn fetch_not_found_exits_with_one() {
        let err = CliError::from(FetchError::not_found("example.com/mod"));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(
            err.to_string(),
            "module example.com/mod not found in module cache"
        );
    }
}
