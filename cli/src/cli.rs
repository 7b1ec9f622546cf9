//! CLI argument definitions for `modfetch`.
//!
//! Argument parsing lives here so the entrypoint and the command runners can
//! share the types without depending on `main.rs`.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use modfetch::config::Protocol;
use modfetch::manifest::DEFAULT_RUNTIME_MODULE;

/// Resolve Go modules into the local module cache.
#[derive(Parser, Debug, Clone)]
#[command(name = "modfetch")]
#[command(version, about)]
#[command(long_about = concat!(
    "Resolve Go modules into the local module cache.\n\n",
    "modfetch checks the module cache first and only runs the go command when ",
    "the requested version is missing. Class-type modules have their go.mod ",
    "rewritten to require the tool's runtime so they build against it.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Fetch the latest version of a module:\n",
    "    $ modfetch get github.com/goplus/spx\n\n",
    "  Fetch a pinned version and canonicalise it for runtime v1.2.0:\n",
    "    $ modfetch get github.com/goplus/spx@v1.0.0 --runtime-version v1.2.0\n\n",
    "  Find a module without touching the network:\n",
    "    $ modfetch locate golang.org/x/mod\n\n",
    "  List cached versions as JSON:\n",
    "    $ modfetch list golang.org/x/mod --json",
))]
pub struct Cli {
    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve a module, fetching it when the cache misses.
    Get(GetArgs),

    /// Resolve a module from the cache only.
    Locate(LocateArgs),

    /// List the cached versions of a module.
    List(ListArgs),
}

/// Options accepted before or after any subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Module cache root [default: GOMODCACHE, GOPATH/pkg/mod or ~/go/pkg/mod].
    #[arg(long, value_name = "DIR", env = "MODFETCH_CACHE_DIR", global = true)]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Go command used to fetch modules.
    #[arg(long, value_name = "PROGRAM", env = "MODFETCH_GO", global = true)]
    pub go: Option<String>,

    /// Configuration file [default: platform config dir/modfetch.toml].
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Kill the go command after this many seconds.
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet",
        global = true
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity", global = true)]
    pub quiet: bool,
}

/// Tool environment options for class-type canonicalisation.
#[derive(Args, Debug, Clone)]
pub struct RuntimeArgs {
    /// Runtime version class-type modules must require.
    #[arg(long, value_name = "VERSION")]
    pub runtime_version: Option<String>,

    /// Runtime module class-type modules must require.
    #[arg(long, value_name = "MODULE", default_value = DEFAULT_RUNTIME_MODULE)]
    pub runtime_module: String,
}

impl Default for RuntimeArgs {
    fn default() -> Self {
        Self {
            runtime_version: None,
            runtime_module: DEFAULT_RUNTIME_MODULE.to_owned(),
        }
    }
}

/// Arguments for the get command.
#[derive(Args, Debug, Clone, Default)]
pub struct GetArgs {
    /// Module to resolve, optionally with `@version`.
    #[arg(value_name = "MODULE")]
    pub module: String,

    /// Always run the go command, even when the cache has a match.
    #[arg(long)]
    pub no_cache: bool,

    /// Acquisition protocol: `install` or `get` [default: from config, else install].
    #[arg(long, value_name = "PROTOCOL")]
    pub protocol: Option<Protocol>,

    /// Tool environment for class-type modules.
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the locate command.
#[derive(Args, Debug, Clone, Default)]
pub struct LocateArgs {
    /// Module to find, optionally with `@version`.
    #[arg(value_name = "MODULE")]
    pub module: String,

    /// Tool environment for class-type modules.
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Module path whose cached versions to list.
    #[arg(value_name = "MODULE")]
    pub module: String,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
