//! Field keys and record indices
//!
//! A Field Key addresses one column across all records: Object nesting is
//! joined with [`FIELD_SEPARATOR`], positions inside arrays that hold scalars
//! or other arrays are joined with [`BRANCH_SEPARATOR`].
//!
//! ```text
//! {"c": {"b": {"x": 5}}}       -> c.b.x
//! {"d": [1, 2]}                -> d-0, d-1
//! {"d": [[1], [2, 3]]}         -> d-0-0, d-1-0, d-1-1
//! {"a": []}                    -> a-0 (empty-collection marker)
//! ```
//!
//! A Record Index addresses one row: the record ordinal followed by one
//! position per array-of-objects level crossed (`1`, `1-0`, `1-0-2`).
//!
//! Field names containing either separator are ambiguous with the encoding.
//! Callers normalize them first (see [`crate::codec::normalize_keys`]).

use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Joins Object field names inside a Field Key.
pub const FIELD_SEPARATOR: char = '.';

/// Joins positions, both inside Field Keys and Record Indices.
pub const BRANCH_SEPARATOR: char = '-';

/// Append a field name to a key prefix. `prefix` may be empty.
pub fn join_field(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{FIELD_SEPARATOR}{name}")
    }
}

/// Append a positional segment to a Field Key.
pub fn join_position(prefix: &str, position: usize) -> String {
    format!("{prefix}{BRANCH_SEPARATOR}{position}")
}

/// Append an array-of-objects position to a Record Index.
pub fn join_index(prefix: &str, position: usize) -> String {
    format!("{prefix}{BRANCH_SEPARATOR}{position}")
}

/// Split a Field Key into its field segments. The empty key has none.
pub fn split_field(key: &str) -> Vec<&str> {
    if key.is_empty() {
        Vec::new()
    } else {
        key.split(FIELD_SEPARATOR).collect()
    }
}

/// Split a Record Index into its ordinal and positions.
pub fn split_index(index: &str) -> Result<Vec<usize>> {
    index
        .split(BRANCH_SEPARATOR)
        .map(|segment| {
            parse_position(segment).ok_or_else(|| CodecError::MalformedIndex {
                index: index.to_string(),
                segment: segment.to_string(),
            })
        })
        .collect()
}

/// Split one key segment into the field name and its trailing positions.
///
/// `"d"` gives `("d", [])`, `"d-1-0"` gives `("d", [1, 0])`. `key` is only
/// used for the error message.
pub fn split_branch<'a>(key: &str, segment: &'a str) -> Result<(&'a str, Vec<usize>)> {
    let Some((name, rest)) = segment.split_once(BRANCH_SEPARATOR) else {
        return Ok((segment, Vec::new()));
    };

    let positions = rest
        .split(BRANCH_SEPARATOR)
        .map(parse_position)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| CodecError::MalformedKey {
            key: key.to_string(),
            segment: segment.to_string(),
        })?;

    Ok((name, positions))
}

fn parse_position(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// Dotted/hyphenated path addressing one leaf column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldKey(String);

impl FieldKey {
    pub fn new(key: impl Into<String>) -> Self {
        FieldKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, name: &str) -> FieldKey {
        FieldKey(join_field(&self.0, name))
    }

    pub fn position(&self, position: usize) -> FieldKey {
        FieldKey(join_position(&self.0, position))
    }

    /// Key of the cell that stands in for this array when it is empty.
    pub fn empty_marker(&self) -> FieldKey {
        self.position(0)
    }

    pub fn segments(&self) -> Vec<&str> {
        split_field(&self.0)
    }
}

impl Borrow<str> for FieldKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldKey {
    fn from(key: &str) -> Self {
        FieldKey::new(key)
    }
}

impl From<String> for FieldKey {
    fn from(key: String) -> Self {
        FieldKey(key)
    }
}

/// Hierarchical row address: record ordinal plus array-of-objects positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordIndex(String);

impl RecordIndex {
    pub fn new(index: impl Into<String>) -> Self {
        RecordIndex(index.into())
    }

    /// Index of a top-level record.
    pub fn record(ordinal: usize) -> Self {
        RecordIndex(ordinal.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index of element `position` of an array of objects below this index.
    pub fn branch(&self, position: usize) -> RecordIndex {
        RecordIndex(join_index(&self.0, position))
    }

    /// Ordinal followed by every array-of-objects position.
    pub fn positions(&self) -> Result<Vec<usize>> {
        split_index(&self.0)
    }

    /// Leading record ordinal only.
    pub fn ordinal(&self) -> Result<usize> {
        let first = self.0.split(BRANCH_SEPARATOR).next().unwrap_or_default();
        parse_position(first).ok_or_else(|| CodecError::MalformedIndex {
            index: self.0.clone(),
            segment: first.to_string(),
        })
    }
}

impl fmt::Display for RecordIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordIndex {
    fn from(index: &str) -> Self {
        RecordIndex::new(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_field_with_empty_prefix() {
        assert_eq!(join_field("", "a"), "a");
        assert_eq!(join_field("c.b", "x"), "c.b.x");
    }

    #[test]
    fn test_split_field_inverts_join() {
        let key = join_field(&join_field("c", "b"), "x");
        assert_eq!(split_field(&key), vec!["c", "b", "x"]);
        assert!(split_field("").is_empty());
    }

    #[test]
    fn test_positional_keys() {
        let key = FieldKey::from("d").position(1).position(0);
        assert_eq!(key.as_str(), "d-1-0");
        assert_eq!(FieldKey::from("a").empty_marker().as_str(), "a-0");
        assert_eq!(FieldKey::default().child("a").child("b").as_str(), "a.b");
    }

    #[test]
    fn test_split_index() {
        let index = RecordIndex::record(3).branch(0).branch(12);
        assert_eq!(index.as_str(), "3-0-12");
        assert_eq!(index.positions().unwrap(), vec![3, 0, 12]);
        assert_eq!(index.ordinal().unwrap(), 3);
    }

    #[test]
    fn test_split_index_rejects_non_numeric_segments() {
        for bad in ["", "1-", "1-x", "-1", "1-+2", "a"] {
            let err = split_index(bad).unwrap_err();
            assert!(matches!(err, CodecError::MalformedIndex { .. }), "{bad}");
        }
        assert!(RecordIndex::from("x-1").ordinal().is_err());
    }

    #[test]
    fn test_split_branch() {
        assert_eq!(split_branch("d", "d").unwrap(), ("d", vec![]));
        assert_eq!(split_branch("d-1-0", "d-1-0").unwrap(), ("d", vec![1, 0]));
        assert!(matches!(
            split_branch("a-b", "a-b"),
            Err(CodecError::MalformedKey { .. })
        ));
    }
}
