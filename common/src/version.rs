//! Ordering for module version strings.
//!
//! Module versions are semantic versions with a mandatory `v` prefix. The
//! shorthands `v1` and `v1.2` stand for `v1.0.0` and `v1.2.0`, build metadata
//! never affects precedence, and anything that fails to parse (including the
//! empty string) sorts below every valid version.

use semver::Version;
use std::cmp::Ordering;

/// Parse a module version into a [`semver::Version`].
///
/// Returns `None` for strings that are not valid module versions.
///
/// # Examples
///
/// ```
/// use modfetch_common::version::parse_version;
///
/// let parsed = parse_version("v1.2").expect("shorthand is valid");
/// assert_eq!((parsed.major, parsed.minor, parsed.patch), (1, 2, 0));
/// assert!(parse_version("1.2.3").is_none());
/// assert!(parse_version("v1-pre").is_none());
/// ```
#[must_use]
pub fn parse_version(version: &str) -> Option<Version> {
    let rest = version.strip_prefix('v')?;
    let split_at = rest
        .char_indices()
        .find(|(_, ch)| matches!(ch, '-' | '+'))
        .map_or(rest.len(), |(idx, _)| idx);
    let (core, tail) = rest.split_at(split_at);

    let components = core.split('.').count();
    let padded = match components {
        3 => core.to_owned(),
        // Shorthand forms may not carry a prerelease or build suffix.
        2 if tail.is_empty() => format!("{core}.0"),
        1 if tail.is_empty() => format!("{core}.0.0"),
        _ => return None,
    };

    Version::parse(&format!("{padded}{tail}")).ok()
}

/// Returns `true` when `version` is a valid module version.
#[must_use]
pub fn is_valid_version(version: &str) -> bool {
    parse_version(version).is_some()
}

/// Returns `true` when `version` is a full `vMAJOR.MINOR.PATCH` version,
/// optionally with a prerelease or build suffix.
///
/// Shorthands such as `v1` are valid but not canonical: they are queries for
/// the newest matching release and never name a module cache directory.
///
/// # Examples
///
/// ```
/// use modfetch_common::is_canonical_version;
///
/// assert!(is_canonical_version("v1.5.0"));
/// assert!(is_canonical_version("v2.0.0+incompatible"));
/// assert!(!is_canonical_version("v1"));
/// assert!(!is_canonical_version("v1.5"));
/// ```
#[must_use]
pub fn is_canonical_version(version: &str) -> bool {
    let core = version.split(['-', '+']).next().unwrap_or_default();
    core.split('.').count() == 3 && is_valid_version(version)
}

/// Compare two module versions by semantic-version precedence.
///
/// Invalid versions compare equal to each other and less than any valid
/// version, so the empty string is the lowest possible value.
///
/// # Examples
///
/// ```
/// use modfetch_common::compare_versions;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_versions("v1.10.0", "v1.9.9"), Ordering::Greater);
/// assert_eq!(compare_versions("", "v0.0.1"), Ordering::Less);
/// assert_eq!(compare_versions("v1.2", "v1.2.0"), Ordering::Equal);
/// ```
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(left), Some(right)) => precedence(&left, &right),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn precedence(left: &Version, right: &Version) -> Ordering {
    (left.major, left.minor, left.patch)
        .cmp(&(right.major, right.minor, right.patch))
        .then_with(|| left.pre.cmp(&right.pre))
}
