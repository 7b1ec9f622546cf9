//! Running the external acquisition command.
//!
//! The acquisition command (`go install` or `go get`) is the only thing that
//! creates module cache directories. This module builds its command line
//! from the active [`FetchPolicy`](crate::config::FetchPolicy), runs it
//! through a [`CommandExecutor`] and captures both output streams.

use crate::config::{FetchConfig, MissingVersion, OnSubprocessFailure};
use crate::error::{FetchError, Result};
use crate::module::ModuleReference;
use log::debug;
use std::borrow::Cow;
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Version query appended to versionless references under
/// [`MissingVersion::AppendLatest`].
pub const LATEST_QUERY: &str = "latest";

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs `program` with `args` and returns the captured output, killing
    /// the process if `timeout` elapses first.
    ///
    /// A nonzero exit is not an error at this level; callers inspect
    /// [`Output::status`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::CommandSpawn`] when the process cannot be
    /// started and [`FetchError::Timeout`] when it is killed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use modfetch::acquire::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("go", &["version".to_owned()], None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), modfetch::error::FetchError>(())
    /// ```
    fn run(&self, program: &str, args: &[String], timeout: Option<Duration>) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, program: &str, args: &[String], timeout: Option<Duration>) -> Result<Output> {
        let command_line = command_line(program, args);
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());

        match timeout {
            None => command
                .output()
                .map_err(|source| FetchError::CommandSpawn {
                    command: command_line,
                    source,
                }),
            Some(limit) => run_with_timeout(command, command_line, limit),
        }
    }
}

/// Runs `command` with piped output, killing it when `timeout` elapses.
///
/// Both pipes are drained on their own threads so a chatty child cannot
/// block on a full pipe while we wait for it.
fn run_with_timeout(
    mut command: Command,
    command_line: String,
    timeout: Duration,
) -> Result<Output> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = command.spawn().map_err(|source| FetchError::CommandSpawn {
        command: command_line.clone(),
        source,
    })?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let waited = child
        .wait_timeout(timeout)
        .map_err(|e| FetchError::io(format!("waiting for {command_line}"), e))?;

    let Some(status) = waited else {
        if let Err(e) = child.kill().and_then(|()| child.wait().map(drop)) {
            debug!("failed to reap {command_line} after timeout: {e}");
        }
        return Err(FetchError::Timeout {
            command: command_line,
            limit: timeout,
        });
    };

    Ok(Output {
        status,
        stdout: collect(stdout, &command_line)?,
        stderr: collect(stderr, &command_line)?,
    })
}

type Drain = JoinHandle<io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut reader: R) -> Drain {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    })
}

fn collect(drained: Option<Drain>, command_line: &str) -> Result<Vec<u8>> {
    let Some(handle) = drained else {
        return Ok(Vec::new());
    };
    let context = || format!("reading output of {command_line}");
    match handle.join() {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(FetchError::io(context(), e)),
        Err(_) => Err(FetchError::io(
            context(),
            io::Error::other("output reader panicked"),
        )),
    }
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// The captured result of one acquisition command.
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// The command line that was run.
    pub command: String,
    /// Exit status of the command.
    pub status: ExitStatus,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error, where the download report is written.
    pub stderr: Vec<u8>,
}

impl Acquisition {
    /// Returns `true` when the command exited successfully.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status.success()
    }

    /// Standard error decoded for report parsing.
    #[must_use]
    pub fn diagnostics(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Convert into a [`FetchError::SubprocessFailure`], keeping stderr
    /// verbatim.
    #[must_use]
    pub fn into_failure(self) -> FetchError {
        FetchError::SubprocessFailure {
            command: self.command,
            status: self.status,
            stderr: self.stderr,
        }
    }
}

/// Runs the acquisition command for module references.
#[derive(Clone, Copy)]
pub struct AcquisitionRunner<'a> {
    config: &'a FetchConfig,
    executor: &'a dyn CommandExecutor,
}

impl<'a> AcquisitionRunner<'a> {
    /// Create a runner using `config`'s command and policy.
    #[must_use]
    pub const fn new(config: &'a FetchConfig, executor: &'a dyn CommandExecutor) -> Self {
        Self { config, executor }
    }

    /// The arguments passed to the go command for `reference`.
    ///
    /// # Examples
    ///
    /// ```
    /// use modfetch::acquire::{AcquisitionRunner, SystemCommandExecutor};
    /// use modfetch::config::FetchConfig;
    /// use modfetch::module::ModuleReference;
    ///
    /// let config = FetchConfig::new("/cache");
    /// let runner = AcquisitionRunner::new(&config, &SystemCommandExecutor);
    /// let reference: ModuleReference = "golang.org/x/tools/gopls".parse()?;
    /// assert_eq!(
    ///     runner.arguments(&reference),
    ///     ["install", "golang.org/x/tools/gopls@latest"]
    /// );
    /// # Ok::<(), modfetch::error::FetchError>(())
    /// ```
    #[must_use]
    pub fn arguments(&self, reference: &ModuleReference) -> Vec<String> {
        let policy = self.config.policy();
        let target = match policy.on_missing_version {
            MissingVersion::AppendLatest if !reference.has_version() => {
                reference.with_version(LATEST_QUERY).to_string()
            }
            _ => reference.to_string(),
        };
        vec![policy.subcommand.clone(), target]
    }

    /// Run the acquisition command for `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::CommandSpawn`] or [`FetchError::Timeout`] from
    /// the executor. Under [`OnSubprocessFailure::AbortImmediately`] a
    /// nonzero exit is returned as [`FetchError::SubprocessFailure`]; under
    /// [`OnSubprocessFailure::TryParseAnyway`] it is handed back for its
    /// report to be parsed.
    pub fn run(&self, reference: &ModuleReference) -> Result<Acquisition> {
        let program = self.config.go_command();
        let args = self.arguments(reference);
        let command = command_line(program, &args);
        debug!("running {command}");

        let output = self
            .executor
            .run(program, &args, self.config.acquire_timeout())?;
        let acquisition = Acquisition {
            command,
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if acquisition.succeeded() {
            return Ok(acquisition);
        }

        debug!("{} exited with {}", acquisition.command, acquisition.status);
        match self.config.policy().on_subprocess_failure {
            OnSubprocessFailure::AbortImmediately => Err(acquisition.into_failure()),
            OnSubprocessFailure::TryParseAnyway => Ok(acquisition),
        }
    }
}
