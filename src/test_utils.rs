//! Shared test utilities for the modfetch crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! integration tests under `tests/`.

use crate::acquire::CommandExecutor;
use crate::error::{FetchError, Result};
use crate::gomod::{CLASS_MANIFEST, GO_MOD};
use camino::{Utf8Path, Utf8PathBuf};
use modfetch_common::escape_path;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};
use std::time::Duration;
use tempfile::TempDir;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a successful command `Output` with the given stderr report.
pub fn report_output(stderr: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Manifest used by plain (non-class) seeded modules.
pub fn plain_go_mod(path: &str) -> String {
    format!("module {path}\n\ngo 1.21\n")
}

/// Class manifest declaring a project entry point.
pub const CLASS_GOP_MOD: &str = "gop 1.2\n\nproject .gmx Game github.com/goplus/spx\n";

/// A module version to write into a cache: its directory and manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededModule {
    /// The module's cache directory.
    pub dir: Utf8PathBuf,
    /// Contents of `go.mod`.
    pub go_mod: String,
    /// Contents of `gop.mod`, when the module has one.
    pub gop_mod: Option<String>,
}

impl SeededModule {
    /// Write the module's directory and manifests, leaving the directory
    /// read-only as the go command does.
    ///
    /// # Panics
    ///
    /// Panics if the files cannot be written.
    pub fn write(&self) {
        std::fs::create_dir_all(&self.dir).expect("create module dir");
        std::fs::write(self.dir.join(GO_MOD), &self.go_mod).expect("write go.mod");
        if let Some(gop_mod) = &self.gop_mod {
            std::fs::write(self.dir.join(CLASS_MANIFEST), gop_mod).expect("write gop.mod");
        }
        set_read_only(&self.dir, true);
    }
}

/// A temporary module cache root.
///
/// Module directories are read-only like a real cache; they are made
/// writable again on drop so the temporary directory can be removed.
#[derive(Debug)]
pub struct CacheFixture {
    temp: TempDir,
    root: Utf8PathBuf,
}

impl CacheFixture {
    /// Create an empty cache.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().join("pkg/mod")).expect("utf-8 temp dir");
        std::fs::create_dir_all(&root).expect("create cache root");
        Self { temp, root }
    }

    /// The cache root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The directory `path@version` occupies in this cache.
    ///
    /// # Panics
    ///
    /// Panics if `path` cannot be escaped.
    pub fn module_dir(&self, path: &str, version: &str) -> Utf8PathBuf {
        let escaped = escape_path(path).expect("escapable module path");
        self.root.join(format!("{escaped}@{version}"))
    }

    /// Describe a plain module without writing it.
    pub fn plain(&self, path: &str, version: &str) -> SeededModule {
        SeededModule {
            dir: self.module_dir(path, version),
            go_mod: plain_go_mod(path),
            gop_mod: None,
        }
    }

    /// Describe a class-type module without writing it.
    pub fn class(&self, path: &str, version: &str) -> SeededModule {
        SeededModule {
            gop_mod: Some(CLASS_GOP_MOD.to_owned()),
            ..self.plain(path, version)
        }
    }

    /// Write a plain module into the cache and return its directory.
    pub fn add_module(&self, path: &str, version: &str) -> Utf8PathBuf {
        let module = self.plain(path, version);
        module.write();
        module.dir
    }

    /// Write a class-type module into the cache and return its directory.
    pub fn add_class_module(&self, path: &str, version: &str) -> Utf8PathBuf {
        let module = self.class(path, version);
        module.write();
        module.dir
    }
}

impl Default for CacheFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CacheFixture {
    fn drop(&mut self) {
        make_tree_writable(self.temp.path());
    }
}

fn make_tree_writable(root: &std::path::Path) {
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        set_read_only_path(&dir, false);
        if let Ok(entries) = std::fs::read_dir(&dir) {
            pending.extend(
                entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|path| path.is_dir()),
            );
        }
    }
}

/// Toggle the owner write bit on a directory.
///
/// # Panics
///
/// Panics if the permissions cannot be changed.
pub fn set_read_only(dir: &Utf8Path, read_only: bool) {
    assert!(
        set_read_only_path(dir.as_std_path(), read_only),
        "failed to change permissions of {dir}"
    );
}

#[cfg(unix)]
fn set_read_only_path(dir: &std::path::Path, read_only: bool) -> bool {
    use std::os::unix::fs::PermissionsExt;

    let mode = if read_only { 0o555 } else { 0o755 };
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode)).is_ok()
}

#[cfg(not(unix))]
fn set_read_only_path(dir: &std::path::Path, read_only: bool) -> bool {
    let Ok(meta) = std::fs::metadata(dir) else {
        return false;
    };
    let mut permissions = meta.permissions();
    permissions.set_readonly(read_only);
    std::fs::set_permissions(dir, permissions).is_ok()
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program to execute (e.g., "go").
    pub program: String,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
    /// Modules written into the cache when the command runs, standing in
    /// for what the go command downloads.
    pub creates: Vec<SeededModule>,
}

impl ExpectedCall {
    /// Expect `program args...`, returning `result`.
    pub fn new<I>(program: impl Into<String>, args: I, result: Result<Output>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            result,
            creates: Vec::new(),
        }
    }

    /// Also write `module` into the cache when the command runs.
    #[must_use]
    pub fn creating(mut self, module: SeededModule) -> Self {
        self.creates.push(module);
        self
    }
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Records expected command invocations and returns predefined results,
/// allowing tests to verify command execution without side effects beyond
/// the declared cache writes. Unexpected invocations are reported as
/// [`FetchError::StubMismatch`].
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    invocations: RefCell<Vec<String>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            invocations: RefCell::new(Vec::new()),
        }
    }

    /// A stub that expects never to be called.
    pub fn unused() -> Self {
        Self::new(Vec::new())
    }

    /// Command lines received so far.
    pub fn invocations(&self) -> Vec<String> {
        self.invocations.borrow().clone()
    }

    /// Number of expected invocations not yet received.
    pub fn remaining(&self) -> usize {
        self.expected.borrow().len()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, program: &str, args: &[String], _timeout: Option<Duration>) -> Result<Output> {
        let received = std::iter::once(program.to_owned())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        self.invocations.borrow_mut().push(received.clone());

        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(FetchError::StubMismatch {
                message: format!("unexpected command invocation: {received}"),
            });
        };

        if call.program != program || call.args.as_slice() != args {
            return Err(FetchError::StubMismatch {
                message: format!(
                    "expected `{} {}`, received `{received}`",
                    call.program,
                    call.args.join(" ")
                ),
            });
        }

        for module in &call.creates {
            module.write();
        }
        call.result
    }
}
