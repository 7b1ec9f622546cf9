//! Resolution configuration.
//!
//! [`FetchConfig`] carries everything the resolver needs from its
//! environment: the module cache root, the acquisition command and the
//! [`FetchPolicy`] that decides how that command is invoked and how its
//! failures are treated. The cache root is always an explicit value so tests
//! can point it at an isolated temporary directory.
//!
//! Values are layered: command-line flags override `modfetch.toml`
//! ([`ConfigFile`]), which overrides the `GOMODCACHE`/`GOPATH` environment
//! ([`resolve_cache_root`]), which overrides the `$HOME/go/pkg/mod` default.

use crate::dirs::BaseDirs;
use crate::error::{FetchError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default acquisition command.
pub const DEFAULT_GO_COMMAND: &str = "go";

/// File name of the optional configuration file.
pub const CONFIG_FILE_NAME: &str = "modfetch.toml";

/// What to pass to the acquisition command when the request has no version.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum MissingVersion {
    /// Append `@latest` to the module path.
    AppendLatest,
    /// Pass the bare module path and let the command pick the version.
    DelegateToSubprocess,
}

/// How a nonzero exit from the acquisition command is treated.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum OnSubprocessFailure {
    /// Keep going: mine stderr for a report and re-check the cache.
    TryParseAnyway,
    /// Fail immediately with the captured stderr.
    AbortImmediately,
}

/// Named acquisition protocols.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    /// `go install <module>@latest`, tolerant of command failures.
    #[default]
    Install,
    /// `go get <module>`, failing hard when the command fails.
    Get,
}

impl Protocol {
    /// Returns the protocol's name as used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Get => "get",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "install" => Ok(Self::Install),
            "get" => Ok(Self::Get),
            other => Err(format!(
                "unknown protocol `{other}`; expected `install` or `get`"
            )),
        }
    }
}

/// Acquisition policy: which subcommand to run and how to treat its outcome.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchPolicy {
    /// Subcommand passed to the acquisition command (`install`, `get`).
    pub subcommand: String,
    /// Argument shaping for version-less requests.
    pub on_missing_version: MissingVersion,
    /// Treatment of a nonzero exit status.
    pub on_subprocess_failure: OnSubprocessFailure,
}

impl FetchPolicy {
    /// Build the policy for a named protocol.
    ///
    /// # Examples
    ///
    /// ```
    /// use modfetch::config::{FetchPolicy, MissingVersion, OnSubprocessFailure, Protocol};
    ///
    /// let policy = FetchPolicy::for_protocol(Protocol::Get);
    /// assert_eq!(policy.subcommand, "get");
    /// assert_eq!(policy.on_missing_version, MissingVersion::DelegateToSubprocess);
    /// assert_eq!(policy.on_subprocess_failure, OnSubprocessFailure::AbortImmediately);
    /// ```
    #[must_use]
    pub fn for_protocol(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Install => Self {
                subcommand: protocol.as_str().to_owned(),
                on_missing_version: MissingVersion::AppendLatest,
                on_subprocess_failure: OnSubprocessFailure::TryParseAnyway,
            },
            Protocol::Get => Self {
                subcommand: protocol.as_str().to_owned(),
                on_missing_version: MissingVersion::DelegateToSubprocess,
                on_subprocess_failure: OnSubprocessFailure::AbortImmediately,
            },
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::for_protocol(Protocol::default())
    }
}

/// Configuration threaded through every resolution component.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FetchConfig {
    cache_root: Utf8PathBuf,
    go_command: String,
    policy: FetchPolicy,
    acquire_timeout: Option<Duration>,
}

impl FetchConfig {
    /// Create a configuration for the given module cache root with the
    /// default command, the `install` protocol and no timeout.
    #[must_use]
    pub fn new(cache_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            go_command: DEFAULT_GO_COMMAND.to_owned(),
            policy: FetchPolicy::default(),
            acquire_timeout: None,
        }
    }

    /// Replace the acquisition command.
    #[must_use]
    pub fn with_go_command(mut self, command: impl Into<String>) -> Self {
        self.go_command = command.into();
        self
    }

    /// Replace the acquisition policy.
    #[must_use]
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set or clear the acquisition timeout.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// The module cache root.
    #[must_use]
    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    /// The acquisition command.
    #[must_use]
    pub fn go_command(&self) -> &str {
        &self.go_command
    }

    /// The acquisition policy.
    #[must_use]
    pub const fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// The acquisition timeout, if any.
    #[must_use]
    pub const fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout
    }
}

/// Contents of `modfetch.toml`.
///
/// Every field is optional; absent fields leave the corresponding
/// [`FetchConfig`] value untouched.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Module cache root override.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Acquisition command override.
    pub go: Option<String>,
    /// Named protocol.
    pub protocol: Option<Protocol>,
    /// Acquisition timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Fine-grained policy overrides applied on top of `protocol`.
    pub policy: PolicyOverrides,
}

/// The `[policy]` table of `modfetch.toml`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyOverrides {
    /// Subcommand override.
    pub subcommand: Option<String>,
    /// Version-less argument shaping override.
    pub on_missing_version: Option<MissingVersion>,
    /// Subprocess failure treatment override.
    pub on_subprocess_failure: Option<OnSubprocessFailure>,
}

impl ConfigFile {
    /// Parse configuration from TOML text. `path` is only used for error
    /// reporting.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ConfigInvalid`] when the text is not valid TOML
    /// or contains unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use modfetch::config::{ConfigFile, Protocol};
    ///
    /// let file = ConfigFile::parse("protocol = \"get\"\n", Utf8Path::new("modfetch.toml"))?;
    /// assert_eq!(file.protocol, Some(Protocol::Get));
    /// # Ok::<(), modfetch::error::FetchError>(())
    /// ```
    pub fn parse(content: &str, path: &Utf8Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| FetchError::ConfigInvalid {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] when the file cannot be read and
    /// [`FetchError::ConfigInvalid`] when it cannot be parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FetchError::io(format!("reading config {path}"), e))?;
        Self::parse(&content, path)
    }

    /// Load `modfetch.toml` from the platform config directory, if present.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_default(dirs: &dyn BaseDirs) -> Result<Option<Self>> {
        let Some(path) = dirs
            .modfetch_config_dir()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
            .map(|dir| dir.join(CONFIG_FILE_NAME))
        else {
            return Ok(None);
        };

        if !path.is_file() {
            log::debug!("no config file at {path}");
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    /// Apply the file's overrides to `config`.
    #[must_use]
    pub fn apply(&self, mut config: FetchConfig) -> FetchConfig {
        if let Some(go) = &self.go {
            config.go_command.clone_from(go);
        }
        if let Some(protocol) = self.protocol {
            config.policy = FetchPolicy::for_protocol(protocol);
        }
        if let Some(subcommand) = &self.policy.subcommand {
            config.policy.subcommand.clone_from(subcommand);
        }
        if let Some(on_missing_version) = self.policy.on_missing_version {
            config.policy.on_missing_version = on_missing_version;
        }
        if let Some(on_subprocess_failure) = self.policy.on_subprocess_failure {
            config.policy.on_subprocess_failure = on_subprocess_failure;
        }
        if let Some(secs) = self.timeout_secs {
            config.acquire_timeout = Some(Duration::from_secs(secs));
        }
        config
    }
}

/// Determine the module cache root.
///
/// Precedence: `explicit`, then a non-empty `GOMODCACHE`, then the first
/// `GOPATH` entry joined with `pkg/mod`, then `$HOME/go/pkg/mod`.
///
/// `lookup` reads environment variables; pass [`env_var`] outside tests.
///
/// # Errors
///
/// Returns [`FetchError::CacheRootUnavailable`] when no source yields a
/// UTF-8 path.
///
/// # Examples
///
/// ```
/// use modfetch::config::resolve_cache_root;
/// use modfetch::dirs::BaseDirs;
/// use std::path::PathBuf;
///
/// struct Homeless;
///
/// impl BaseDirs for Homeless {
///     fn home_dir(&self) -> Option<PathBuf> { None }
///     fn modfetch_config_dir(&self) -> Option<PathBuf> { None }
/// }
///
/// let lookup = |name: &str| (name == "GOMODCACHE").then(|| "/srv/modcache".to_owned());
/// let root = resolve_cache_root(None, lookup, &Homeless)?;
/// assert_eq!(root, "/srv/modcache");
/// # Ok::<(), modfetch::error::FetchError>(())
/// ```
pub fn resolve_cache_root<F>(
    explicit: Option<&Utf8Path>,
    lookup: F,
    dirs: &dyn BaseDirs,
) -> Result<Utf8PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = explicit {
        return Ok(root.to_owned());
    }

    if let Some(modcache) = lookup("GOMODCACHE").filter(|v| !v.trim().is_empty()) {
        return Ok(Utf8PathBuf::from(modcache));
    }

    if let Some(gopath) = lookup("GOPATH") {
        let first_entry = std::env::split_paths(&gopath)
            .find(|p| !p.as_os_str().is_empty())
            .and_then(|p| Utf8PathBuf::from_path_buf(p).ok());
        if let Some(first) = first_entry {
            return Ok(first.join("pkg").join("mod"));
        }
    }

    dirs.home_dir()
        .and_then(|home| Utf8PathBuf::from_path_buf(home).ok())
        .map(|home| home.join("go").join("pkg").join("mod"))
        .ok_or(FetchError::CacheRootUnavailable)
}

/// Read an environment variable, treating non-UTF-8 values as unset.
#[must_use]
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use rstest::rstest;
    use std::path::PathBuf;

    fn home_dirs(home: Option<&str>) -> MockBaseDirs {
        let home = home.map(PathBuf::from);
        let mut dirs = MockBaseDirs::new();
        dirs.expect_home_dir().returning(move || home.clone());
        dirs
    }

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[test]
    fn explicit_root_wins() {
        let dirs = home_dirs(Some("/home/u"));
        let root = resolve_cache_root(
            Some(Utf8Path::new("/flag")),
            env_of(&[("GOMODCACHE", "/env")]),
            &dirs,
        )
        .expect("explicit root");
        assert_eq!(root, "/flag");
    }

    #[rstest]
    #[case::gomodcache(&[("GOMODCACHE", "/mc"), ("GOPATH", "/gp")], "/mc")]
    #[case::blank_gomodcache_falls_through(
        &[("GOMODCACHE", "  "), ("GOPATH", "/gp")],
        "/gp/pkg/mod"
    )]
    #[case::gopath(&[("GOPATH", "/gp")], "/gp/pkg/mod")]
    #[case::home_default(&[], "/home/u/go/pkg/mod")]
    fn environment_precedence(
        #[case] env: &'static [(&'static str, &'static str)],
        #[case] expected: &str,
    ) {
        let dirs = home_dirs(Some("/home/u"));
        let root = resolve_cache_root(None, env_of(env), &dirs).expect("root resolves");
        assert_eq!(root, expected);
    }

    #[cfg(unix)]
    #[test]
    fn gopath_uses_first_entry() {
        let dirs = home_dirs(None);
        let root = resolve_cache_root(None, env_of(&[("GOPATH", "/first:/second")]), &dirs)
            .expect("root resolves");
        assert_eq!(root, "/first/pkg/mod");
    }

    #[test]
    fn missing_everything_is_an_error() {
        let dirs = home_dirs(None);
        let err = resolve_cache_root(None, env_of(&[]), &dirs).expect_err("no root");
        assert!(matches!(err, FetchError::CacheRootUnavailable));
    }

    #[test]
    fn real_environment_lookup_is_honoured() {
        let dirs = home_dirs(None);
        temp_env::with_vars(
            [("GOMODCACHE", Some("/from/env")), ("GOPATH", None::<&str>)],
            || {
                let root = resolve_cache_root(None, env_var, &dirs).expect("root resolves");
                assert_eq!(root, "/from/env");
            },
        );
    }

    #[test]
    fn config_file_overrides_policy_fields() {
        let file = ConfigFile::parse(
            r#"
go = "/usr/local/go/bin/go"
protocol = "get"
timeout_secs = 30

[policy]
on_subprocess_failure = "try-parse-anyway"
"#,
            Utf8Path::new("modfetch.toml"),
        )
        .expect("valid config");

        let config = file.apply(FetchConfig::new("/cache"));
        assert_eq!(config.go_command(), "/usr/local/go/bin/go");
        assert_eq!(config.policy().subcommand, "get");
        assert_eq!(
            config.policy().on_missing_version,
            MissingVersion::DelegateToSubprocess
        );
        assert_eq!(
            config.policy().on_subprocess_failure,
            OnSubprocessFailure::TryParseAnyway
        );
        assert_eq!(config.acquire_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn config_file_rejects_unknown_keys() {
        let err = ConfigFile::parse("cache = \"/x\"\n", Utf8Path::new("bad.toml"))
            .expect_err("unknown key");
        assert!(matches!(err, FetchError::ConfigInvalid { path, .. } if path == "bad.toml"));
    }

    #[test]
    fn load_default_is_none_without_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config_dir = temp.path().to_path_buf();
        let mut dirs = MockBaseDirs::new();
        dirs.expect_modfetch_config_dir()
            .returning(move || Some(config_dir.clone()));

        assert_eq!(ConfigFile::load_default(&dirs).expect("no error"), None);
    }

    #[test]
    fn load_default_reads_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        std::fs::write(temp.path().join(CONFIG_FILE_NAME), "protocol = \"install\"\n")
            .expect("write config");
        let config_dir = temp.path().to_path_buf();
        let mut dirs = MockBaseDirs::new();
        dirs.expect_modfetch_config_dir()
            .returning(move || Some(config_dir.clone()));

        let file = ConfigFile::load_default(&dirs)
            .expect("readable")
            .expect("file present");
        assert_eq!(file.protocol, Some(Protocol::Install));
    }

    #[rstest]
    #[case("install", Protocol::Install)]
    #[case("get", Protocol::Get)]
    fn protocol_round_trips_through_str(#[case] text: &str, #[case] protocol: Protocol) {
        assert_eq!(text.parse::<Protocol>(), Ok(protocol));
        assert_eq!(protocol.to_string(), text);
    }
}
