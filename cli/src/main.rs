//! `modfetch` CLI entrypoint.
//!
//! Parses the command line, installs the log subscriber and hands off to
//! [`modfetch_cli::run::run`] with the real go command, manifest loader and
//! platform directories.

use clap::Parser;
use modfetch::acquire::SystemCommandExecutor;
use modfetch::config::env_var;
use modfetch::dirs::{BaseDirs, SystemBaseDirs};
use modfetch::gomod::FsManifestLoader;
use modfetch_cli::cli::Cli;
use modfetch_cli::error::CliError;
use modfetch_cli::logging;
use modfetch_cli::run::{Environment, UnavailableDirs, run};
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.global.verbosity, cli.global.quiet);

    let system_dirs = SystemBaseDirs::new();
    let dirs: &dyn BaseDirs = match &system_dirs {
        Some(dirs) => dirs,
        None => &UnavailableDirs,
    };
    let env = Environment {
        executor: &SystemCommandExecutor,
        loader: &FsManifestLoader,
        dirs,
        lookup: &env_var,
    };

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &env, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn exit_code_for_run_result(result: Result<(), CliError>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                write_stderr_line(stderr, format_args!("  caused by: {cause}"));
                source = cause.source();
            }
            err.exit_code()
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}
