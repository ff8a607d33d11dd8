//! Typed paths into a value tree
//!
//! Field names such as `customers[2].address.city` are tokenized into a
//! sequence of segments. A segment made only of ASCII digits addresses a list
//! element, every other segment addresses a map key. `a.0` and `a[0]` name the
//! same location.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A single segment in a path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Seg {
    /// Map key access
    Key(String),
    /// List index access
    Index(usize),
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Returns true if this is an index segment.
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Seg::Index(_))
    }

    /// Get the index if this is an index segment.
    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Key(_) => None,
            Seg::Index(i) => Some(*i),
        }
    }

    fn from_token(token: &str) -> Self {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = token.parse::<usize>() {
                return Seg::Index(index);
            }
        }
        Seg::Key(token.to_string())
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

thread_local! {
    static PARSE_CACHE: RefCell<HashMap<String, Path>> = RefCell::new(HashMap::new());
}

/// A complete path into a value tree.
///
/// # Examples
///
/// ```
/// use fieldline_core::{Path, Seg};
///
/// let path = Path::parse("users[0].name");
/// assert_eq!(path.segments(), &[Seg::key("users"), Seg::Index(0), Seg::key("name")]);
/// assert_eq!(path.to_string(), "users[0].name");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Parse a field name into a path.
    ///
    /// Tokens are separated by `.`, `[` and `]`; empty tokens are dropped, so
    /// `a..b`, `a[b]` and `a.b` all parse to the same path. Parsed keys are
    /// cached per thread since field names repeat constantly.
    pub fn parse(key: &str) -> Path {
        if key.is_empty() {
            return Path::root();
        }
        if let Some(path) = PARSE_CACHE.with(|cache| cache.borrow().get(key).cloned()) {
            return path;
        }
        let path = Path(
            key.split(['.', '[', ']'])
                .filter(|token| !token.is_empty())
                .map(Seg::from_token)
                .collect(),
        );
        PARSE_CACHE.with(|cache| {
            cache.borrow_mut().insert(key.to_string(), path.clone());
        });
        path
    }

    /// Append a key segment and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of segments in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The path made of the first `len` segments.
    pub fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                Seg::Key(k) if i == 0 => write!(f, "{}", k)?,
                Seg::Key(k) => write!(f, ".{}", k)?,
                Seg::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_empty() {
        assert!(Path::parse("").is_empty());
    }

    #[test]
    fn test_parse_dotted_and_bracketed() {
        let path = Path::parse("a.b[3].c");
        assert_eq!(
            path.segments(),
            &[Seg::key("a"), Seg::key("b"), Seg::Index(3), Seg::key("c")]
        );
        assert_eq!(Path::parse("a.b.3.c"), path);
        assert_eq!(Path::parse("a[b][3][c]"), path);
    }

    #[test]
    fn test_parse_drops_empty_tokens() {
        assert_eq!(Path::parse("a..b"), Path::root().key("a").key("b"));
        assert_eq!(Path::parse("[0]"), Path::root().index(0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Path::parse("items[0].name").to_string(), "items[0].name");
        assert_eq!(Path::root().index(2).key("x").to_string(), "[2].x");
    }

    #[test]
    fn test_mixed_token_is_key() {
        assert_eq!(Path::parse("a.1b").segments()[1], Seg::key("1b"));
    }

    #[test]
    fn test_prefix() {
        let path = Path::parse("a[1].b");
        assert_eq!(path.prefix(2), Path::parse("a[1]"));
        assert_eq!(path.prefix(10), path);
    }

    proptest! {
        #[test]
        fn prop_reparse_is_idempotent(
            segs in prop::collection::vec(
                prop_oneof![
                    "[a-z_][a-z0-9_]{0,6}".prop_map(Seg::Key),
                    (0usize..1000).prop_map(Seg::Index),
                ],
                0..6,
            )
        ) {
            let path = Path::from_segments(segs);
            let once = Path::parse(&path.to_string());
            let twice = Path::parse(&once.to_string());
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.to_string(), path.to_string());
        }
    }
}
