//! Pattern scanner: finds hostname-shaped spans in arbitrary text.
//!
//! Four independent pattern families run over the same text. Their outputs
//! overlap freely; deduplication happens downstream.

use std::sync::LazyLock;

use regex::{CaptureMatches, Captures, Regex};

/// One DNS label: alphanumeric at both ends, hyphens allowed inside.
const LABEL: &str = r"[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?";

fn host_shape() -> String {
    format!(r"(?:{LABEL}\.)+[A-Za-z]{{2,}}")
}

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("built-in scan pattern failed to compile: {err}"),
    }
}

static SCHEME_PREFIXED: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"[A-Za-z][A-Za-z0-9+.\-]*://({})", host_shape())));
static BARE: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?:^|[^A-Za-z0-9\-%])({})", host_shape())));
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r#"["']({})["']"#, host_shape())));
static PERCENT_ENCODED: LazyLock<Regex> =
    LazyLock::new(|| compile(&format!(r"(?i:%2F%2F)({})", host_shape())));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternFamily {
    /// `scheme://host`
    SchemePrefixed,
    /// Dotted labels bounded by non-identifier characters. A preceding `%`
    /// counts as part of an escape, so `%2Fcdn.example.com` is left to
    /// [`PatternFamily::PercentEncoded`].
    Bare,
    /// Dotted labels enclosed in single or double quotes.
    Quoted,
    /// `%2F%2F` followed by dotted labels.
    PercentEncoded,
}

pub const ALL_FAMILIES: [PatternFamily; 4] = [
    PatternFamily::SchemePrefixed,
    PatternFamily::Bare,
    PatternFamily::Quoted,
    PatternFamily::PercentEncoded,
];

impl PatternFamily {
    fn regex(self) -> &'static Regex {
        match self {
            PatternFamily::SchemePrefixed => &*SCHEME_PREFIXED,
            PatternFamily::Bare => &*BARE,
            PatternFamily::Quoted => &*QUOTED,
            PatternFamily::PercentEncoded => &*PERCENT_ENCODED,
        }
    }

    /// Strips the wrapper from a match. `None` when the match is not a
    /// candidate after all (bare match running into identifier text).
    fn candidate<'t>(self, text: &'t str, caps: &Captures<'t>) -> Option<&'t str> {
        let host = caps.get(1)?;
        match self {
            PatternFamily::SchemePrefixed => caps.get(0).map(|m| m.as_str()),
            PatternFamily::Bare => {
                let next = text[host.end()..].chars().next();
                if next.is_some_and(is_identifier_char) {
                    None
                } else {
                    Some(host.as_str())
                }
            }
            PatternFamily::Quoted | PatternFamily::PercentEncoded => Some(host.as_str()),
        }
    }
}

fn is_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'t> {
    pub family: PatternFamily,
    pub text: &'t str,
}

/// Lazy sequence of candidates over one text blob.
///
/// Families run one after another; calling [`scan`] again restarts from the
/// beginning.
pub struct Candidates<'t> {
    text: &'t str,
    remaining: std::slice::Iter<'static, PatternFamily>,
    current: Option<(PatternFamily, CaptureMatches<'static, 't>)>,
}

impl<'t> Iterator for Candidates<'t> {
    type Item = Candidate<'t>;

    fn next(&mut self) -> Option<Candidate<'t>> {
        loop {
            if let Some((family, matches)) = self.current.as_mut() {
                for caps in matches {
                    if let Some(text) = family.candidate(self.text, &caps) {
                        return Some(Candidate {
                            family: *family,
                            text,
                        });
                    }
                }
            }
            let family = *self.remaining.next()?;
            self.current = Some((family, family.regex().captures_iter(self.text)));
        }
    }
}

pub fn scan(text: &str) -> Candidates<'_> {
    Candidates {
        text,
        remaining: ALL_FAMILIES.iter(),
        current: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from(family: PatternFamily, text: &str) -> Vec<&str> {
        scan(text)
            .filter(|c| c.family == family)
            .map(|c| c.text)
            .collect()
    }

    #[test]
    fn scheme_family_keeps_scheme_for_normalizer() {
        assert_eq!(
            from(PatternFamily::SchemePrefixed, "see https://api.example.com/v1 now"),
            vec!["https://api.example.com"]
        );
    }

    #[test]
    fn bare_family_rejects_matches_running_into_identifiers() {
        assert_eq!(from(PatternFamily::Bare, "x api.example.com1"), Vec::<&str>::new());
        assert_eq!(
            from(PatternFamily::Bare, "host=cdn.example.net;"),
            vec!["cdn.example.net"]
        );
    }

    #[test]
    fn bare_family_skips_percent_escape_tails() {
        assert_eq!(from(PatternFamily::Bare, "u=%2F%2Fcdn.example.com"), Vec::<&str>::new());
    }

    #[test]
    fn quoted_family_strips_quotes() {
        assert_eq!(
            from(PatternFamily::Quoted, r#"var h = "static.example.org";"#),
            vec!["static.example.org"]
        );
    }

    #[test]
    fn percent_encoded_family_matches_either_case() {
        assert_eq!(
            from(
                PatternFamily::PercentEncoded,
                "?next=https%3A%2f%2Flogin.example.com%2Fcb"
            ),
            vec!["login.example.com"]
        );
    }

    #[test]
    fn rescanning_restarts_from_the_beginning() {
        let text = "a.example.com and 'b.example.com'";
        let first: Vec<_> = scan(text).collect();
        let second: Vec<_> = scan(text).collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }
}
