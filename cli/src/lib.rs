//! Command-line front end for `modfetch`.
//!
//! The `modfetch` binary resolves Go modules into the local module cache,
//! locates cached modules without fetching, and lists cached versions. The
//! pieces live in this library so they can be tested without spawning the
//! binary.
//!
//! # Modules
//!
//! - [`cli`] - Argument definitions
//! - [`error`] - CLI error type and exit codes
//! - [`logging`] - Stderr log subscriber setup
//! - [`output`] - Human and JSON result formatting
//! - [`run`] - Subcommand execution

pub mod cli;
pub mod error;
pub mod logging;
pub mod output;
pub mod run;
