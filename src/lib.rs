//! Resolve Go modules to version-pinned module cache entries.
//!
//! `modfetch` guarantees that a requested module version is present in the
//! local Go module cache, running `go install` (or `go get`) only when the
//! cache cannot already satisfy the request, and reports whether the module
//! is class-type. Class-type modules have their `go.mod` rewritten into
//! canonical form for the calling tool environment while their read-only
//! cache directory is briefly made writable.
//!
//! ```no_run
//! use modfetch::acquire::SystemCommandExecutor;
//! use modfetch::config::FetchConfig;
//! use modfetch::gomod::FsManifestLoader;
//! use modfetch::resolver::{GetOptions, Resolver};
//!
//! let config = FetchConfig::new("/home/me/go/pkg/mod");
//! let resolver = Resolver::new(&config, &SystemCommandExecutor, &FsManifestLoader);
//! let module = resolver.get(
//!     &"golang.org/x/mod@v0.14.0".parse()?,
//!     None,
//!     GetOptions::default(),
//!     &mut std::io::stderr(),
//! )?;
//! assert_eq!(module.version(), "v0.14.0");
//! # Ok::<(), modfetch::error::FetchError>(())
//! ```
//!
//! # Modules
//!
//! - [`acquire`] - Running the acquisition command
//! - [`cache`] - Module cache lookup and version listing
//! - [`config`] - Fetch policy, configuration file and cache root discovery
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Error types
//! - [`gomod`] - Filesystem `go.mod` / `gop.mod` manifest loader
//! - [`manifest`] - Class-type classification and canonicalisation
//! - [`module`] - Module references and resolution results
//! - [`permissions`] - Scoped write access to read-only directories
//! - [`report`] - Download report parsing
//! - [`resolver`] - The resolve-or-fetch protocol

pub mod acquire;
pub mod cache;
pub mod config;
pub mod dirs;
pub mod error;
pub mod gomod;
pub mod manifest;
pub mod module;
pub mod permissions;
pub mod report;
pub mod resolver;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use error::{FetchError, Result};
pub use manifest::ToolEnv;
pub use module::{ModuleReference, Resolution, ResolvedModule};
pub use resolver::{GetOptions, Resolver};
