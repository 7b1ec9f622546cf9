//! Case-safe escaping for module paths.
//!
//! Module caches live on case-insensitive filesystems as often as not, so an
//! uppercase letter in a module path is stored as `!` followed by its
//! lowercase form (`github.com/Azure/go` becomes `github.com/!azure/go`). The
//! escape is only defined for valid module paths, which are checked first.

use thiserror::Error;

/// Errors raised when a module path cannot be escaped or unescaped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EscapeError {
    /// The path was empty.
    #[error("empty module path")]
    Empty,

    /// The path contains a character that module paths never carry.
    #[error("invalid character {ch:?} in module path {path}")]
    InvalidChar {
        /// The offending path.
        path: String,
        /// The rejected character.
        ch: char,
    },

    /// A `/`-separated element of the path is malformed.
    #[error("malformed module path {path}: {reason}")]
    Malformed {
        /// The offending path.
        path: String,
        /// Which rule the path broke.
        reason: &'static str,
    },
}

/// Escape a module path for use as a module cache directory name.
///
/// # Errors
///
/// Returns an [`EscapeError`] when the path is empty, contains characters
/// outside `[A-Za-z0-9-._~/]`, or has empty, `.`-only, dot-prefixed or
/// dot-suffixed elements.
///
/// # Examples
///
/// ```
/// use modfetch_common::escape_path;
///
/// assert_eq!(escape_path("github.com/Azure/go").as_deref(), Ok("github.com/!azure/go"));
/// assert!(escape_path("github.com//x").is_err());
/// ```
pub fn escape_path(path: &str) -> Result<String, EscapeError> {
    check_path(path)?;

    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        if ch.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(ch.to_ascii_lowercase());
        } else {
            escaped.push(ch);
        }
    }
    Ok(escaped)
}

/// Reverse [`escape_path`], recovering the original module path.
///
/// # Errors
///
/// Returns an [`EscapeError`] when the input contains an uppercase letter, a
/// `!` that is not followed by a lowercase letter, or decodes to an invalid
/// module path.
///
/// # Examples
///
/// ```
/// use modfetch_common::unescape_path;
///
/// assert_eq!(unescape_path("github.com/!azure/go").as_deref(), Ok("github.com/Azure/go"));
/// assert!(unescape_path("github.com/Azure/go").is_err());
/// ```
pub fn unescape_path(escaped: &str) -> Result<String, EscapeError> {
    let mut path = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '!' => match chars.next() {
                Some(next) if next.is_ascii_lowercase() => path.push(next.to_ascii_uppercase()),
                _ => {
                    return Err(EscapeError::Malformed {
                        path: escaped.to_owned(),
                        reason: "`!` must precede a lowercase letter",
                    });
                }
            },
            c if c.is_ascii_uppercase() => {
                return Err(EscapeError::InvalidChar {
                    path: escaped.to_owned(),
                    ch: c,
                });
            }
            c => path.push(c),
        }
    }

    check_path(&path)?;
    Ok(path)
}

fn check_path(path: &str) -> Result<(), EscapeError> {
    if path.is_empty() {
        return Err(EscapeError::Empty);
    }

    if let Some(ch) = path.chars().find(|ch| !is_path_char(*ch)) {
        return Err(EscapeError::InvalidChar {
            path: path.to_owned(),
            ch,
        });
    }

    let malformed = |reason| EscapeError::Malformed {
        path: path.to_owned(),
        reason,
    };

    if path.starts_with('/') {
        return Err(malformed("leading slash"));
    }
    if path.ends_with('/') {
        return Err(malformed("trailing slash"));
    }

    for element in path.split('/') {
        if element.is_empty() {
            return Err(malformed("double slash"));
        }
        if element.starts_with('.') {
            return Err(malformed("element starts with a dot"));
        }
        if element.ends_with('.') {
            return Err(malformed("element ends with a dot"));
        }
    }

    if path.starts_with('-') {
        return Err(malformed("leading dash in first path element"));
    }

    Ok(())
}

const fn is_path_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '~' | '/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("golang.org/x/mod", "golang.org/x/mod")]
    #[case::single_element("mod", "mod")]
    #[case::uppercase("github.com/BurntSushi/toml", "github.com/!burnt!sushi/toml")]
    #[case::tilde("example.com/~user/pkg", "example.com/~user/pkg")]
    fn escapes_valid_paths(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_path(input).as_deref(), Ok(expected));
    }

    #[rstest]
    #[case::empty("")]
    #[case::leading_slash("/abs/path")]
    #[case::trailing_slash("example.com/x/")]
    #[case::double_slash("example.com//x")]
    #[case::dot_element("example.com/./x")]
    #[case::dotdot_element("example.com/../x")]
    #[case::bang("example.com/!x")]
    #[case::space("example.com/a b")]
    #[case::non_ascii("example.com/é")]
    #[case::backslash("example.com\\x")]
    #[case::leading_dash("-flag")]
    fn rejects_invalid_paths(#[case] input: &str) {
        assert!(escape_path(input).is_err(), "expected {input:?} to be rejected");
    }

    #[test]
    fn empty_path_has_dedicated_error() {
        assert_eq!(escape_path(""), Err(EscapeError::Empty));
    }

    #[test]
    fn invalid_char_reports_character() {
        let err = escape_path("a/b c").expect_err("space should be rejected");
        assert_eq!(
            err,
            EscapeError::InvalidChar {
                path: "a/b c".to_owned(),
                ch: ' ',
            }
        );
    }

    #[rstest]
    #[case::trailing_bang("github.com/x!")]
    #[case::bang_before_digit("github.com/!1")]
    #[case::raw_uppercase("github.com/X")]
    fn unescape_rejects_malformed_input(#[case] input: &str) {
        assert!(unescape_path(input).is_err());
    }

    #[test]
    fn unescape_inverts_escape() {
        let original = "github.com/GoPlus/Spx";
        let escaped = escape_path(original).expect("valid path");
        assert_eq!(unescape_path(&escaped).as_deref(), Ok(original));
    }
}
