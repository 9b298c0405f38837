//! Route pattern parsing and matching.
//!
//! Patterns are validated once at construction; matching is a positional
//! walk over the pattern and the request path with no allocation.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The pattern string was empty.
    #[error("route pattern is empty")]
    Empty,

    /// The pattern did not start with `/`.
    #[error("route pattern must be an absolute path starting with '/': {0:?}")]
    NotAbsolute(String),

    /// A wildcard marker appeared anywhere other than immediately after
    /// the final `/` of the pattern.
    #[error("wildcard marker must immediately follow the final '/': {0:?}")]
    MisplacedWildcard(String),

    /// The wildcard marker was not followed by a name.
    #[error("wildcard segment has no name: {0:?}")]
    UnnamedWildcard(String),

    /// More than one wildcard marker was present.
    #[error("only a single trailing wildcard is supported: {0:?}")]
    MultipleWildcards(String),
}

/// The shape of a parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternKind {
    /// Matched character-for-character against the request path.
    Literal,

    /// A literal prefix ending in `/`, followed by a named segment that
    /// captures any non-empty suffix of the request path.
    Wildcard {
        /// Name of the capture (the text after `:`).
        name: String,
        /// Byte length of the literal prefix, including the final `/`.
        prefix_len: usize,
    },
}

/// A validated route pattern.
///
/// Constructed with [`RoutePattern::parse`], which enforces wildcard
/// placement up front so request-time matching never has to re-validate
/// the pattern.
///
/// # Example
///
/// ```rust
/// use pharos_route::RoutePattern;
///
/// let literal = RoutePattern::parse("/chat")?;
/// assert!(literal.matches("/chat"));
/// assert!(!literal.matches("/chat/extra"));
///
/// let wildcard = RoutePattern::parse("/chat/:room")?;
/// assert_eq!(wildcard.wildcard_segment("/chat/room1"), Some("room1"));
/// # Ok::<(), pharos_route::PatternError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    kind: PatternKind,
}

impl RoutePattern {
    /// Parses and validates a route pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] if the pattern is empty, not absolute,
    /// or uses the wildcard marker anywhere other than as the entire
    /// final segment.
    pub fn parse(pattern: impl Into<String>) -> Result<Self, PatternError> {
        let raw = pattern.into();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute(raw));
        }

        let Some(marker) = raw.find(':') else {
            return Ok(Self {
                raw,
                kind: PatternKind::Literal,
            });
        };

        if raw[marker + 1..].contains(':') {
            return Err(PatternError::MultipleWildcards(raw));
        }

        // The pattern starts with '/', so rfind always succeeds.
        let last_slash = raw.rfind('/').unwrap_or(0);
        if marker != last_slash + 1 {
            return Err(PatternError::MisplacedWildcard(raw));
        }

        let name = raw[marker + 1..].to_string();
        if name.is_empty() {
            return Err(PatternError::UnnamedWildcard(raw));
        }

        Ok(Self {
            kind: PatternKind::Wildcard {
                name,
                prefix_len: marker,
            },
            raw,
        })
    }

    /// The pattern as originally written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The shape of this pattern.
    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    /// Whether this pattern ends in a wildcard segment.
    pub fn is_wildcard(&self) -> bool {
        matches!(self.kind, PatternKind::Wildcard { .. })
    }

    /// The wildcard capture name, if this pattern has one.
    pub fn wildcard_name(&self) -> Option<&str> {
        match &self.kind {
            PatternKind::Literal => None,
            PatternKind::Wildcard { name, .. } => Some(name),
        }
    }

    /// Checks whether a request path matches this pattern.
    ///
    /// Literal patterns require positional equality through the full
    /// length of both strings. Wildcard patterns compare only through the
    /// literal prefix (up to and including the final `/`); once the
    /// prefix is consumed the match succeeds for any non-empty remainder.
    pub fn matches(&self, path: &str) -> bool {
        match &self.kind {
            PatternKind::Literal => self.raw == path,
            PatternKind::Wildcard { prefix_len, .. } => {
                path.len() > *prefix_len && path.starts_with(&self.raw[..*prefix_len])
            }
        }
    }

    /// Extracts the wildcard segment from a matching request path.
    ///
    /// Returns `None` for literal patterns and for paths that do not
    /// match. The captured suffix is everything after the literal prefix
    /// and may itself contain `/`.
    pub fn wildcard_segment<'p>(&self, path: &'p str) -> Option<&'p str> {
        match &self.kind {
            PatternKind::Literal => None,
            PatternKind::Wildcard { prefix_len, .. } => {
                if self.matches(path) {
                    Some(&path[*prefix_len..])
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for RoutePattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_literal() {
        let pattern = RoutePattern::parse("/chat").unwrap();
        assert_eq!(pattern.kind(), &PatternKind::Literal);
        assert!(!pattern.is_wildcard());
        assert_eq!(pattern.wildcard_name(), None);
    }

    #[test]
    fn test_parse_wildcard() {
        let pattern = RoutePattern::parse("/chat/:room").unwrap();
        assert!(pattern.is_wildcard());
        assert_eq!(pattern.wildcard_name(), Some("room"));
        assert_eq!(
            pattern.kind(),
            &PatternKind::Wildcard {
                name: "room".to_string(),
                prefix_len: 6,
            }
        );
    }

    #[test]
    fn test_parse_root_wildcard() {
        let pattern = RoutePattern::parse("/:id").unwrap();
        assert!(pattern.is_wildcard());
        assert_eq!(pattern.wildcard_segment("/abc"), Some("abc"));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(RoutePattern::parse(""), Err(PatternError::Empty));
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!(matches!(
            RoutePattern::parse("chat"),
            Err(PatternError::NotAbsolute(_))
        ));
    }

    #[test]
    fn test_parse_rejects_interior_wildcard() {
        assert!(matches!(
            RoutePattern::parse("/a/:b/c"),
            Err(PatternError::MisplacedWildcard(_))
        ));
    }

    #[test]
    fn test_parse_rejects_marker_inside_segment() {
        assert!(matches!(
            RoutePattern::parse("/chat/room:id"),
            Err(PatternError::MisplacedWildcard(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unnamed_wildcard() {
        assert!(matches!(
            RoutePattern::parse("/chat/:"),
            Err(PatternError::UnnamedWildcard(_))
        ));
    }

    #[test]
    fn test_parse_rejects_multiple_wildcards() {
        assert!(matches!(
            RoutePattern::parse("/:a/:b"),
            Err(PatternError::MultipleWildcards(_))
        ));
    }

    #[test]
    fn test_literal_match_exact_only() {
        let pattern = RoutePattern::parse("/chat").unwrap();
        assert!(pattern.matches("/chat"));
        assert!(!pattern.matches("/chat/"));
        assert!(!pattern.matches("/chat/room1"));
        assert!(!pattern.matches("/cha"));
        assert!(!pattern.matches("/chatx"));
    }

    #[test]
    fn test_wildcard_match_and_capture() {
        let pattern = RoutePattern::parse("/chat/:id").unwrap();

        assert!(pattern.matches("/chat/room1"));
        assert_eq!(pattern.wildcard_segment("/chat/room1"), Some("room1"));

        assert!(pattern.matches("/chat/anything"));
        assert_eq!(pattern.wildcard_segment("/chat/anything"), Some("anything"));
    }

    #[test]
    fn test_wildcard_rejects_prefix_collision() {
        let pattern = RoutePattern::parse("/chat/:id").unwrap();
        assert!(!pattern.matches("/chatroom"));
        assert_eq!(pattern.wildcard_segment("/chatroom"), None);
    }

    #[test]
    fn test_wildcard_requires_nonempty_suffix() {
        let pattern = RoutePattern::parse("/chat/:id").unwrap();
        assert!(!pattern.matches("/chat/"));
        assert!(!pattern.matches("/chat"));
        assert!(!pattern.matches("/"));
    }

    #[test]
    fn test_wildcard_captures_whole_remainder() {
        let pattern = RoutePattern::parse("/files/:path").unwrap();
        assert!(pattern.matches("/files/images/logo.png"));
        assert_eq!(
            pattern.wildcard_segment("/files/images/logo.png"),
            Some("images/logo.png")
        );
    }

    #[test]
    fn test_literal_never_captures() {
        let pattern = RoutePattern::parse("/chat").unwrap();
        assert_eq!(pattern.wildcard_segment("/chat"), None);
    }

    #[test]
    fn test_display_round_trips() {
        let pattern = RoutePattern::parse("/chat/:room").unwrap();
        assert_eq!(pattern.to_string(), "/chat/:room");
        assert_eq!(pattern.as_str(), "/chat/:room");
    }

    #[test]
    fn test_from_str() {
        let pattern: RoutePattern = "/chat/:room".parse().unwrap();
        assert!(pattern.is_wildcard());
    }

    proptest! {
        #[test]
        fn prop_wildcard_captures_arbitrary_suffix(suffix in "[a-zA-Z0-9_.~-]{1,32}(/[a-zA-Z0-9_.~-]{1,16}){0,3}") {
            let pattern = RoutePattern::parse("/chat/:room").unwrap();
            let path = format!("/chat/{suffix}");
            prop_assert!(pattern.matches(&path));
            prop_assert_eq!(pattern.wildcard_segment(&path), Some(suffix.as_str()));
        }

        #[test]
        fn prop_literal_matches_only_itself(path in "/[a-z]{1,12}") {
            let pattern = RoutePattern::parse("/chat").unwrap();
            prop_assert_eq!(pattern.matches(&path), path == "/chat");
        }
    }
}
