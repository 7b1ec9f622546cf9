//! Parsing the acquisition command's download report.
//!
//! The go command announces what it materialised in the module cache on
//! stderr, interleaved with unrelated diagnostics:
//!
//! ```text
//! go: downloading github.com/goplus/yap v0.8.1
//! go get: added github.com/goplus/yap v0.8.1
//! ```
//!
//! [`parse`] finds the first such line; [`reports`] walks all of them.

use crate::module::ModuleReference;

const GO_PREFIX: &str = "go: ";
const DOWNLOADING: &str = "go: downloading ";
const ADDED: &str = "go get: added ";

/// Which message shape a [`Report`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// `go: downloading <path> <version>`.
    Downloading,
    /// `go get: added <path> <version>`.
    Added,
}

/// One recognised line of the download report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report<'a> {
    /// The module version named by the line; always pinned.
    pub module: ModuleReference,
    /// Which shape matched.
    pub kind: ReportKind,
    /// Progress text to echo to the user (`downloading <path> <version>`),
    /// present for [`ReportKind::Downloading`] only.
    pub progress: Option<&'a str>,
    /// Everything after the matched line.
    pub remainder: &'a str,
}

/// Find the first recognised report line in `text`.
///
/// Lines end at `\n`; a trailing `\r` is dropped and a final line without
/// a newline is accepted. Recognised lines whose module part is not exactly
/// `<path> <version>` are skipped rather than half-parsed.
///
/// # Examples
///
/// ```
/// use modfetch::report::parse;
///
/// let report = parse("go: downloading a/b v1.0.0\nextra\n").expect("report");
/// assert_eq!(report.module.to_string(), "a/b@v1.0.0");
/// assert_eq!(report.progress, Some("downloading a/b v1.0.0"));
/// assert_eq!(report.remainder, "extra\n");
///
/// assert!(parse("go: finding module for package a/b\n").is_none());
/// ```
#[must_use]
pub fn parse(text: &str) -> Option<Report<'_>> {
    let mut rest = text;
    while !rest.is_empty() {
        let (raw, remainder) = rest.split_once('\n').unwrap_or((rest, ""));
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(report) = parse_line(line, remainder) {
            return Some(report);
        }
        rest = remainder;
    }
    None
}

/// Iterate over every report in `text`, in order.
///
/// # Examples
///
/// ```
/// use modfetch::report::reports;
///
/// let text = "go: downloading a/b v1.0.0\nnoise\ngo get: added a/b v1.0.0\n";
/// assert_eq!(reports(text).count(), 2);
/// ```
#[must_use]
pub fn reports(text: &str) -> Reports<'_> {
    Reports { rest: text }
}

/// Iterator returned by [`reports`].
#[derive(Debug, Clone)]
pub struct Reports<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Reports<'a> {
    type Item = Report<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let report = parse(self.rest)?;
        self.rest = report.remainder;
        Some(report)
    }
}

fn parse_line<'a>(line: &'a str, remainder: &'a str) -> Option<Report<'a>> {
    if let Some(spec) = line.strip_prefix(DOWNLOADING) {
        return Some(Report {
            module: module_version(spec)?,
            kind: ReportKind::Downloading,
            progress: line.strip_prefix(GO_PREFIX),
            remainder,
        });
    }
    if let Some(spec) = line.strip_prefix(ADDED) {
        return Some(Report {
            module: module_version(spec)?,
            kind: ReportKind::Added,
            progress: None,
            remainder,
        });
    }
    None
}

fn module_version(spec: &str) -> Option<ModuleReference> {
    let (path, version) = spec.split_once(' ')?;
    if path.is_empty() || version.is_empty() || version.contains(char::is_whitespace) {
        return None;
    }
    Some(ModuleReference::new(path, Some(version.to_owned())))
}
