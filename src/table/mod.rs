//! Tabular side of the codec
//!
//! Storage engines plug in through [`TableSink`] (write path) and
//! [`TableSource`] (read path). Each group of the schema becomes one table:
//! a header row listing Field Keys, then one row per Record Index. Column 0
//! of every row holds the Record Index; Field Key columns start at 1.
//!
//! [`Workbook`] is an in-memory implementation of both traits.

pub mod memory;
pub mod reader;
pub mod rows;
pub mod value;
pub mod writer;

pub use memory::{Sheet, StoredRow, Workbook};
pub use reader::{Lookahead, RecordReader};
pub use rows::RowAssigner;
pub use value::{is_url, TableValue};
pub use writer::TableWriter;

use crate::key::{FieldKey, RecordIndex};
use anyhow::Result;

/// Column holding the Record Index of each row
pub const INDEX_COLUMN: usize = 0;

/// Receives tables from the write path
pub trait TableSink {
    /// Create a table and write its header. `columns[i]` goes to column `i + 1`.
    fn create_table(&mut self, name: &str, columns: &[FieldKey]) -> Result<()>;

    /// Record the Record Index of `row`
    fn write_index(&mut self, table: &str, row: usize, index: &RecordIndex) -> Result<()>;

    fn write_value(&mut self, table: &str, row: usize, column: usize, value: TableValue)
        -> Result<()>;
}

/// Supplies tables to the read path
pub trait TableSource {
    /// Table names in the order they were written
    fn table_names(&self) -> Vec<String>;

    /// Field Keys of the header row, in column order
    fn header(&self, table: &str) -> Result<Vec<FieldKey>>;

    /// Number of data rows, header excluded
    fn row_count(&self, table: &str) -> Result<usize>;

    /// Data row `row`, counted from 0 below the header
    fn read_row(&self, table: &str, row: usize) -> Result<TableRow>;
}

/// One data row as read back from a table
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub index: RecordIndex,
    /// One slot per header column; `None` where nothing was written
    pub values: Vec<Option<TableValue>>,
}
