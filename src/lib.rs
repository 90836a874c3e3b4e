//! # jsonsheet - Documents to Tables and Back
//!
//! A structural codec between nested JSON documents and flat tables.
//! Every leaf of a document becomes a cell addressed by a Field Key (its
//! column) and a Record Index (its row). Arrays of objects get a table of
//! their own, so any document can be written as a set of sheets and rebuilt
//! from them without losing structure.
//!
//! ## Modules
//!
//! - **key**: Field Key and Record Index encoding
//! - **codec**: flattening, unflattening and field renaming
//! - **schema**: group discovery, which decides the table of every column
//! - **table**: sink/source traits, row assignment, reader/writer and an
//!   in-memory workbook
//! - **convert**: whole-collection conversion in both directions
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonsheet::{from_tables, to_tables, CodecConfig, Workbook};
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let documents = vec![json!({
//!     "id": 1,
//!     "tags": ["a", "b"],
//!     "posts": [
//!         {"id": 10, "title": "First Post"},
//!         {"id": 11, "title": "Second Post"}
//!     ]
//! })];
//!
//! let mut book = Workbook::new(0);
//! let schema = to_tables(&documents, &mut book, CodecConfig::default())?;
//!
//! // "main" holds id, tags-0, tags-1; "posts" holds posts.id, posts.title
//! assert_eq!(schema.groups().collect::<Vec<_>>(), vec!["main", "posts"]);
//!
//! let records = from_tables(&book, CodecConfig::default())?;
//! assert_eq!(records, documents);
//! # Ok(())
//! # }
//! ```
//!
//! ### Cells
//!
//! ```rust
//! use jsonsheet::{flatten, RecordIndex};
//! use serde_json::json;
//!
//! let document = json!({"e": [{"f": 5}, {"f": 100}]});
//! let cells: Vec<String> = flatten(&document, RecordIndex::record(1))
//!     .map(|cell| format!("{} @ {}", cell.key, cell.index))
//!     .collect();
//! assert_eq!(cells, vec!["e.f @ 1-0", "e.f @ 1-1"]);
//! ```

use anyhow::Result;
use serde_json::Value;

pub mod codec;
pub mod convert;
pub mod error;
pub mod key;
pub mod schema;
pub mod table;
pub mod types;

// Re-export commonly used types for convenience
pub use codec::{flatten, flatten_selected, normalize_keys, rename_keys, unflatten, RenameMap, Unflattener};
pub use convert::{DocumentSource, ExportSummary, FromTables, ToTables};
pub use error::CodecError;
pub use key::{FieldKey, RecordIndex, BRANCH_SEPARATOR, FIELD_SEPARATOR};
pub use schema::{discover, Schema, SchemaBuilder};
pub use table::{RecordReader, RowAssigner, TableRow, TableSink, TableSource, TableValue, TableWriter, Workbook};
pub use types::{Cell, CellValue, CodecConfig};

/// Main entry point: write a document collection into tables
pub fn to_tables<S: TableSink + ?Sized>(
    documents: &[Value],
    sink: &mut S,
    config: CodecConfig,
) -> Result<Schema> {
    let summary = ToTables::new(config).write(documents, sink)?;
    Ok(summary.schema)
}

/// Read every record back from tables written by [`to_tables`]
pub fn from_tables<T: TableSource + ?Sized>(source: &T, config: CodecConfig) -> Result<Vec<Value>> {
    FromTables::new(config).read_all(source)
}
