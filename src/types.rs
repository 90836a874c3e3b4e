use crate::key::{FieldKey, RecordIndex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value carried by a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// String, number, boolean or null
    Scalar(Value),
    /// The array at this key had no elements
    EmptyList,
}

impl CellValue {
    pub fn is_empty_list(&self) -> bool {
        matches!(self, CellValue::EmptyList)
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        CellValue::Scalar(value)
    }
}

/// One leaf of a document - the unit exchanged between tree and table form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Column address, e.g. "c.b.x" or "d-1"
    pub key: FieldKey,

    /// Row address, e.g. "1" or "1-0-2"
    pub index: RecordIndex,

    pub value: CellValue,
}

impl Cell {
    pub fn new(key: FieldKey, index: RecordIndex, value: CellValue) -> Self {
        Cell { key, index, value }
    }

    pub fn scalar(key: impl Into<FieldKey>, index: impl Into<RecordIndex>, value: Value) -> Self {
        Cell::new(key.into(), index.into(), CellValue::Scalar(value))
    }

    pub fn empty_list(key: impl Into<FieldKey>, index: impl Into<RecordIndex>) -> Self {
        Cell::new(key.into(), index.into(), CellValue::EmptyList)
    }
}

/// Configuration for converting documents to tables and back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Name of the table holding fields outside any array of objects
    pub root_group: String,

    /// Ordinal given to the first record
    pub first_ordinal: usize,

    /// Row of the header line; data rows start right below it
    pub header_row: usize,

    /// Only inspect the first N documents when discovering groups
    pub sample_size: Option<usize>,

    /// Replacement for separator characters found in field names
    pub key_replacement: char,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            root_group: String::from("main"),
            first_ordinal: 1,
            header_row: 0,
            sample_size: None,
            key_replacement: '_',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: CodecConfig = serde_json::from_value(json!({"sample_size": 10})).unwrap();
        assert_eq!(config.sample_size, Some(10));
        assert_eq!(config.root_group, "main");
        assert_eq!(config.first_ordinal, 1);
        assert_eq!(config.key_replacement, '_');
    }

    #[test]
    fn test_cell_constructors() {
        let cell = Cell::scalar("c.b.x", "1", json!(5));
        assert_eq!(cell.key.as_str(), "c.b.x");
        assert_eq!(cell.value, CellValue::Scalar(json!(5)));
        assert!(Cell::empty_list("a-0", "1").value.is_empty_list());
    }
}
