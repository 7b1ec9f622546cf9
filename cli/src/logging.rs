//! Diagnostic logging setup.
//!
//! The library logs through the `log` facade; the subscriber installed here
//! bridges those records and writes them to stderr so stdout stays reserved
//! for results.

use tracing_subscriber::EnvFilter;

/// Environment variable consulted when no `-v`/`-q` flag is given.
pub const LOG_ENV: &str = "RUST_LOG";

const DEFAULT_DIRECTIVES: &str = "warn";

/// Choose the filter directives for the given flags.
///
/// `-q` and `-v` take precedence over `rust_log`; without either flag a
/// non-empty `rust_log` is used as-is.
///
/// # Examples
///
/// ```
/// use modfetch_cli::logging::filter_directives;
///
/// assert_eq!(filter_directives(0, false, None), "warn");
/// assert_eq!(filter_directives(0, false, Some("modfetch=trace")), "modfetch=trace");
/// assert_eq!(
///     filter_directives(1, false, Some("modfetch=trace")),
///     "warn,modfetch=debug,modfetch_cli=debug"
/// );
/// ```
#[must_use]
pub fn filter_directives(verbosity: u8, quiet: bool, rust_log: Option<&str>) -> String {
    match (quiet, verbosity) {
        (true, _) => "error".to_owned(),
        (false, 0) => rust_log
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_DIRECTIVES)
            .to_owned(),
        (false, 1) => "warn,modfetch=debug,modfetch_cli=debug".to_owned(),
        (false, _) => "warn,modfetch=trace,modfetch_cli=trace".to_owned(),
    }
}

/// Install the stderr subscriber.
///
/// Invalid `RUST_LOG` directives fall back to the default filter. A second
/// call is a no-op.
pub fn init(verbosity: u8, quiet: bool) {
    let rust_log = std::env::var(LOG_ENV).ok();
    let directives = filter_directives(verbosity, quiet, rust_log.as_deref());
    let filter =
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        // A subscriber is already installed; keep it.
    }
}
