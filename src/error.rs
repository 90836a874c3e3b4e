//! Error types for the tree/table codec

use thiserror::Error;

/// Errors raised while encoding or decoding cells.
///
/// Every variant is local to one cell or one record; earlier output is never
/// affected. Callers decide whether to skip the record or abort.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A Record Index segment is not a non-negative integer.
    #[error("malformed record index {index:?}: segment {segment:?} is not a non-negative integer")]
    MalformedIndex { index: String, segment: String },

    /// A positional key segment carries a branch piece that is not an integer.
    #[error("malformed field key {key:?}: segment {segment:?} has a non-numeric position")]
    MalformedKey { key: String, segment: String },

    /// A Field Key has no Schema entry.
    #[error("field key {key:?} is not part of the schema")]
    UnknownGroup { key: String },

    /// Cells imply an Object where an Array already exists, or the reverse.
    #[error("structural mismatch for key {key:?} at {path:?}: expected {expected}")]
    StructuralMismatch {
        key: String,
        path: String,
        expected: &'static str,
    },

    /// A top-level record must be an Object to be written as rows.
    #[error("record {ordinal} is not an object")]
    NotAnObject { ordinal: usize },
}

impl CodecError {
    pub(crate) fn mismatch(key: &str, path: &str, expected: &'static str) -> Self {
        CodecError::StructuralMismatch {
            key: key.to_string(),
            path: path.to_string(),
            expected,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CodecError>;
