//! Typed table values
//!
//! Storage engines format cells by kind. URL detection is informational
//! only: a URL reads back as the same string it was written from.

use crate::types::CellValue;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

static URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?|ftp)://[-_.!~*'()a-zA-Z0-9;/?:@&=+$,%#]+$").unwrap()
});

/// True for strings shaped like an http(s) or ftp URL
pub fn is_url(s: &str) -> bool {
    URL_REGEX.is_match(s)
}

/// A cell as a storage engine sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TableValue {
    Number(Number),
    Bool(bool),
    Text(String),
    Url(String),
    /// Blank cell standing for null
    Null,
    /// Blank cell standing for an empty array
    EmptyList,
}

impl TableValue {
    pub fn into_cell(self) -> CellValue {
        match self {
            TableValue::Number(n) => CellValue::Scalar(Value::Number(n)),
            TableValue::Bool(b) => CellValue::Scalar(Value::Bool(b)),
            TableValue::Text(s) | TableValue::Url(s) => CellValue::Scalar(Value::String(s)),
            TableValue::Null => CellValue::Scalar(Value::Null),
            TableValue::EmptyList => CellValue::EmptyList,
        }
    }
}

impl From<CellValue> for TableValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::EmptyList => TableValue::EmptyList,
            CellValue::Scalar(Value::Null) => TableValue::Null,
            CellValue::Scalar(Value::Bool(b)) => TableValue::Bool(b),
            CellValue::Scalar(Value::Number(n)) => TableValue::Number(n),
            CellValue::Scalar(Value::String(s)) if is_url(&s) => TableValue::Url(s),
            CellValue::Scalar(Value::String(s)) => TableValue::Text(s),
            // Containers never come out of flattening; keep them readable
            CellValue::Scalar(other) => TableValue::Text(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_detection() {
        assert!(is_url("https://example.com/a?b=1"));
        assert!(is_url("ftp://files.example.org/pub"));
        assert!(!is_url("example.com"));
        assert!(!is_url("see https://example.com"));
    }

    #[test]
    fn test_cell_kinds() {
        assert_eq!(TableValue::from(CellValue::Scalar(json!(3))), TableValue::Number(3.into()));
        assert_eq!(TableValue::from(CellValue::Scalar(json!(true))), TableValue::Bool(true));
        assert_eq!(
            TableValue::from(CellValue::Scalar(json!("http://a.b"))),
            TableValue::Url("http://a.b".to_string())
        );
        assert_eq!(
            TableValue::from(CellValue::Scalar(json!("plain"))),
            TableValue::Text("plain".to_string())
        );
        assert_eq!(TableValue::from(CellValue::Scalar(Value::Null)), TableValue::Null);
        assert_eq!(TableValue::from(CellValue::EmptyList), TableValue::EmptyList);
    }

    #[test]
    fn test_blanks_stay_distinct_on_read() {
        assert_eq!(TableValue::Null.into_cell(), CellValue::Scalar(Value::Null));
        assert_eq!(TableValue::EmptyList.into_cell(), CellValue::EmptyList);
        assert_eq!(
            TableValue::Url("https://x.y".to_string()).into_cell(),
            CellValue::Scalar(json!("https://x.y"))
        );
    }
}
