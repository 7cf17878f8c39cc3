//! Index Tokens
//!
//! Keys for value index lookups: a single value or a value interval, each
//! tagged with the kind of node it addresses.

use std::fmt;
use std::ops::Bound;

use crate::data::NodeKind;
use crate::error::{QueryError, QueryResult};

/// Kind of value index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    Text,
    Attribute,
}

impl IndexType {
    /// Kind of the nodes stored in this index
    #[inline]
    pub fn node_kind(&self) -> NodeKind {
        match self {
            IndexType::Text => NodeKind::Text,
            IndexType::Attribute => NodeKind::Attribute,
        }
    }

    /// Flag passed to `NodeStore::text`
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self, IndexType::Text)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Text => "TEXT",
            IndexType::Attribute => "ATTRIBUTE",
        }
    }
}

/// Exact value lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexToken {
    pub kind: IndexType,
    pub value: Box<[u8]>,
}

impl IndexToken {
    pub fn new(kind: IndexType, value: &[u8]) -> Self {
        IndexToken {
            kind,
            value: value.into(),
        }
    }
}

/// Value interval lookup; an absent bound is unbounded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringRange {
    pub kind: IndexType,
    pub min: Option<Box<[u8]>>,
    pub min_inclusive: bool,
    pub max: Option<Box<[u8]>>,
    pub max_inclusive: bool,
}

impl StringRange {
    /// Closed interval `[min, max]`
    pub fn new(kind: IndexType, min: &[u8], max: &[u8]) -> Self {
        StringRange {
            kind,
            min: Some(min.into()),
            min_inclusive: true,
            max: Some(max.into()),
            max_inclusive: true,
        }
    }

    /// Interval with explicit bounds and inclusivity
    pub fn with_bounds(
        kind: IndexType,
        min: Option<&[u8]>,
        min_inclusive: bool,
        max: Option<&[u8]>,
        max_inclusive: bool,
    ) -> Self {
        StringRange {
            kind,
            min: min.map(Into::into),
            min_inclusive,
            max: max.map(Into::into),
            max_inclusive,
        }
    }

    /// Lower bound in `std::ops::Bound` form
    pub fn lower(&self) -> Bound<&[u8]> {
        match &self.min {
            None => Bound::Unbounded,
            Some(min) if self.min_inclusive => Bound::Included(&min[..]),
            Some(min) => Bound::Excluded(&min[..]),
        }
    }

    /// Upper bound in `std::ops::Bound` form
    pub fn upper(&self) -> Bound<&[u8]> {
        match &self.max {
            None => Bound::Unbounded,
            Some(max) if self.max_inclusive => Bound::Included(&max[..]),
            Some(max) => Bound::Excluded(&max[..]),
        }
    }

    /// Check if the interval cannot contain any value (`min == max` with an exclusive bound)
    pub fn is_degenerate(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => min == max && !(self.min_inclusive && self.max_inclusive),
            _ => false,
        }
    }

    /// Reject intervals whose lower bound exceeds the upper bound
    pub fn validate(&self) -> QueryResult<()> {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) if min > max => Err(QueryError::InvalidToken {
                token: self.to_string(),
                reason: "lower bound exceeds upper bound",
            }),
            _ => Ok(()),
        }
    }

    /// Range predicate on a node value (byte-lexicographic)
    pub fn contains(&self, value: &[u8]) -> bool {
        let above_min = match &self.min {
            None => true,
            Some(min) if self.min_inclusive => value >= &min[..],
            Some(min) => value > &min[..],
        };
        above_min
            && match &self.max {
                None => true,
                Some(max) if self.max_inclusive => value <= &max[..],
                Some(max) => value < &max[..],
            }
    }
}

/// Lookup performed by an index access
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexQuery {
    Exact(IndexToken),
    Range(StringRange),
}

impl IndexQuery {
    #[inline]
    pub fn index_type(&self) -> IndexType {
        match self {
            IndexQuery::Exact(token) => token.kind,
            IndexQuery::Range(range) => range.kind,
        }
    }

    /// Check if all lookup values are short enough to be indexed
    pub fn fits(&self, maxlen: usize) -> bool {
        match self {
            IndexQuery::Exact(token) => token.value.len() <= maxlen,
            IndexQuery::Range(range) => {
                range.min.as_ref().map_or(0, |min| min.len()) <= maxlen
                    && range.max.as_ref().map_or(0, |max| max.len()) <= maxlen
            }
        }
    }

    /// Value predicate shared by scans and index verification
    #[inline]
    pub fn matches(&self, value: &[u8]) -> bool {
        match self {
            IndexQuery::Exact(token) => &token.value[..] == value,
            IndexQuery::Range(range) => range.contains(value),
        }
    }

    pub fn validate(&self) -> QueryResult<()> {
        match self {
            IndexQuery::Exact(_) => Ok(()),
            IndexQuery::Range(range) => range.validate(),
        }
    }
}

impl fmt::Display for StringRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.min_inclusive { "[" } else { "(" })?;
        match &self.min {
            Some(min) => write!(f, "\"{}\"", String::from_utf8_lossy(min))?,
            None => f.write_str("*")?,
        }
        f.write_str(", ")?;
        match &self.max {
            Some(max) => write!(f, "\"{}\"", String::from_utf8_lossy(max))?,
            None => f.write_str("*")?,
        }
        f.write_str(if self.max_inclusive { "]" } else { ")" })
    }
}

impl fmt::Display for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexQuery::Exact(token) => write!(
                f,
                "{} \"{}\"",
                token.kind.as_str(),
                String::from_utf8_lossy(&token.value)
            ),
            IndexQuery::Range(range) => write!(f, "{} {}", range.kind.as_str(), range),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_range_inclusivity() {
        let range = StringRange::with_bounds(IndexType::Text, Some(&b"b"[..]), false, Some(&b"d"[..]), true);
        assert!(!range.contains(b"b"));
        assert!(range.contains(b"c"));
        assert!(range.contains(b"d"));
        assert!(!range.contains(b"e"));
        // prefixes sort before their extensions
        assert!(range.contains(b"bb"));
        assert!(!range.contains(b"da"));
    }

    #[test]
    fn test_open_bounds() {
        let below = StringRange::with_bounds(IndexType::Attribute, None, true, Some(&b"m"[..]), false);
        assert!(below.contains(b""));
        assert!(below.contains(b"apple"));
        assert!(!below.contains(b"m"));
        assert!(!below.contains(b"zebra"));
    }

    #[test]
    fn test_validate() {
        let range = StringRange::new(IndexType::Text, b"z", b"a");
        let err = range.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidToken);
        assert!(err.to_string().contains("[\"z\", \"a\"]"));
        assert!(StringRange::new(IndexType::Text, b"a", b"a").validate().is_ok());
    }

    #[test]
    fn test_fits() {
        let query = IndexQuery::Range(StringRange::with_bounds(
            IndexType::Text,
            Some(&b"abc"[..]),
            true,
            None,
            true,
        ));
        assert!(query.fits(3));
        assert!(!query.fits(2));
        assert!(IndexQuery::Exact(IndexToken::new(IndexType::Text, b"")).fits(0));
    }

    #[test]
    fn test_degenerate() {
        let open = StringRange::with_bounds(IndexType::Text, Some(&b"a"[..]), false, Some(&b"a"[..]), true);
        assert!(open.is_degenerate());
        assert!(!StringRange::new(IndexType::Text, b"a", b"a").is_degenerate());
    }
}
