//! Subcommand execution.
//!
//! Every collaborator with side effects (the go command, manifest access,
//! platform directories and the process environment) arrives through
//! [`Environment`], so the runners can be driven against a temporary cache
//! and a stubbed executor.

use crate::cli::{Cli, Command, GetArgs, GlobalArgs, ListArgs, LocateArgs, RuntimeArgs};
use crate::error::{CliError, Result};
use crate::output::{
    format_module_human, format_module_json, format_versions_human, format_versions_json,
};
use log::debug;
use modfetch::acquire::CommandExecutor;
use modfetch::cache::CacheLocator;
use modfetch::config::{ConfigFile, FetchConfig, FetchPolicy, Protocol, resolve_cache_root};
use modfetch::dirs::BaseDirs;
use modfetch::manifest::ManifestLoader;
use modfetch::{GetOptions, ModuleReference, ResolvedModule, Resolver, ToolEnv};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Side-effecting collaborators for the runners.
#[derive(Clone, Copy)]
pub struct Environment<'a> {
    /// Runs the go command.
    pub executor: &'a dyn CommandExecutor,
    /// Loads module manifests.
    pub loader: &'a dyn ManifestLoader,
    /// Platform home and config directories.
    pub dirs: &'a dyn BaseDirs,
    /// Environment variable lookup.
    pub lookup: &'a dyn Fn(&str) -> Option<String>,
}

/// [`BaseDirs`] for hosts where no home directory can be determined.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableDirs;

impl BaseDirs for UnavailableDirs {
    fn home_dir(&self) -> Option<PathBuf> {
        None
    }

    fn modfetch_config_dir(&self) -> Option<PathBuf> {
        None
    }
}

/// Run the parsed command line.
///
/// Results are written to `stdout`; download progress goes to `stderr`
/// unless `--quiet` is set.
///
/// # Errors
///
/// Returns [`CliError::NotCached`] when `locate` misses, and
/// [`CliError::Fetch`] or [`CliError::WriteFailed`] for every other failure.
pub fn run(
    cli: &Cli,
    env: &Environment<'_>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    match &cli.command {
        Command::Get(args) => run_get(&cli.global, args, env, stdout, stderr),
        Command::Locate(args) => run_locate(&cli.global, args, env, stdout),
        Command::List(args) => run_list(&cli.global, args, env, stdout),
    }
}

/// Layer the configuration sources: command-line flags, then the config
/// file, then the environment.
///
/// `--config` names the file explicitly and must exist; otherwise
/// `modfetch.toml` in the platform config directory is used when present.
///
/// # Errors
///
/// Returns [`CliError::Fetch`] when the config file cannot be read or
/// parsed, or no cache root can be determined.
pub fn build_config(
    global: &GlobalArgs,
    protocol: Option<Protocol>,
    env: &Environment<'_>,
) -> Result<FetchConfig> {
    let file = match &global.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default(env.dirs)?.unwrap_or_default(),
    };

    let explicit = global.cache_dir.as_deref().or(file.cache_dir.as_deref());
    let cache_root = resolve_cache_root(explicit, env.lookup, env.dirs)?;
    let mut config = file.apply(FetchConfig::new(cache_root));

    if let Some(go) = &global.go {
        config = config.with_go_command(go.clone());
    }
    if let Some(preset) = protocol {
        config = config.with_policy(FetchPolicy::for_protocol(preset));
    }
    if let Some(secs) = global.timeout {
        config = config.with_acquire_timeout(Some(Duration::from_secs(secs)));
    }

    debug!(
        "module cache {}, command `{} {}`",
        config.cache_root(),
        config.go_command(),
        config.policy().subcommand
    );
    Ok(config)
}

fn tool_env(runtime: &RuntimeArgs) -> Option<ToolEnv> {
    runtime
        .runtime_version
        .as_ref()
        .map(|version| ToolEnv::new(runtime.runtime_module.clone(), version.clone()))
}

fn run_get(
    global: &GlobalArgs,
    args: &GetArgs,
    env: &Environment<'_>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let config = build_config(global, args.protocol, env)?;
    let reference = ModuleReference::parse(&args.module)?;
    let runtime_env = tool_env(&args.runtime);
    let options = GetOptions {
        no_cache: args.no_cache,
    };

    let mut sink = std::io::sink();
    let progress: &mut dyn Write = if global.quiet { &mut sink } else { stderr };

    let module = Resolver::new(&config, env.executor, env.loader).get(
        &reference,
        runtime_env.as_ref(),
        options,
        progress,
    )?;
    write_output(stdout, &render_module(&module, args.json))
}

fn run_locate(
    global: &GlobalArgs,
    args: &LocateArgs,
    env: &Environment<'_>,
    stdout: &mut dyn Write,
) -> Result<()> {
    let config = build_config(global, None, env)?;
    let reference = ModuleReference::parse(&args.module)?;
    let runtime_env = tool_env(&args.runtime);

    let module = Resolver::new(&config, env.executor, env.loader)
        .locate(&reference, runtime_env.as_ref())
        .map_err(|err| {
            if err.is_not_found() {
                CliError::NotCached {
                    module: reference.to_string(),
                    cache_root: config.cache_root().to_string(),
                }
            } else {
                CliError::Fetch(err)
            }
        })?;
    write_output(stdout, &render_module(&module, args.json))
}

fn run_list(
    global: &GlobalArgs,
    args: &ListArgs,
    env: &Environment<'_>,
    stdout: &mut dyn Write,
) -> Result<()> {
    let config = build_config(global, None, env)?;
    let reference = ModuleReference::parse(&args.module)?;
    let hits = CacheLocator::new(config.cache_root()).list_versions(reference.path())?;

    let output = if args.json {
        format_versions_json(reference.path(), &hits)
    } else {
        format_versions_human(reference.path(), &hits)
    };
    write_output(stdout, &output)
}

fn render_module(module: &ResolvedModule, json: bool) -> String {
    if json {
        format_module_json(module)
    } else {
        format_module_human(module)
    }
}

fn write_output(stdout: &mut dyn Write, output: &str) -> Result<()> {
    writeln!(stdout, "{output}").map_err(|source| CliError::WriteFailed { source })
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
