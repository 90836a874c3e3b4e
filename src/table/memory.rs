//! In-memory tabular store
//!
//! Rows are addressed the way a spreadsheet addresses them: `header_row`
//! is the header, data rows start right below it.

use crate::key::{FieldKey, RecordIndex};
use crate::table::{TableRow, TableSink, TableSource, TableValue, INDEX_COLUMN};
use anyhow::{anyhow, bail, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named tables, kept in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    header_row: usize,
    sheets: IndexMap<String, Sheet>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub columns: Vec<FieldKey>,
    pub rows: Vec<StoredRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub index: Option<RecordIndex>,
    /// Slot `i` belongs to column `i + 1`
    pub values: Vec<Option<TableValue>>,
}

impl Sheet {
    /// Value written under `key` in data row `row` (0-based).
    pub fn value(&self, row: usize, key: &str) -> Option<&TableValue> {
        let column = self.columns.iter().position(|c| c.as_str() == key)?;
        self.rows.get(row)?.values.get(column)?.as_ref()
    }

    /// Record Index of every data row, in row order.
    pub fn indices(&self) -> Vec<Option<&str>> {
        self.rows
            .iter()
            .map(|row| row.index.as_ref().map(RecordIndex::as_str))
            .collect()
    }
}

impl Workbook {
    pub fn new(header_row: usize) -> Self {
        Workbook {
            header_row,
            sheets: IndexMap::new(),
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Sheet> {
        self.sheets
            .get_mut(name)
            .ok_or_else(|| anyhow!("no table named '{name}'"))
    }

    fn existing(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .get(name)
            .ok_or_else(|| anyhow!("no table named '{name}'"))
    }

    // Storage row to slot in `Sheet::rows`, growing the sheet as needed
    fn row_mut(&mut self, table: &str, row: usize) -> Result<&mut StoredRow> {
        let header_row = self.header_row;
        if row <= header_row {
            bail!("row {row} of table '{table}' is not below the header row {header_row}");
        }
        let slot = row - header_row - 1;
        let sheet = self.sheet_mut(table)?;
        if sheet.rows.len() <= slot {
            sheet.rows.resize_with(slot + 1, StoredRow::default);
        }
        Ok(&mut sheet.rows[slot])
    }
}

impl TableSink for Workbook {
    fn create_table(&mut self, name: &str, columns: &[FieldKey]) -> Result<()> {
        if self.sheets.contains_key(name) {
            bail!("table '{name}' already exists");
        }
        self.sheets.insert(
            name.to_string(),
            Sheet {
                columns: columns.to_vec(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    fn write_index(&mut self, table: &str, row: usize, index: &RecordIndex) -> Result<()> {
        self.row_mut(table, row)?.index = Some(index.clone());
        Ok(())
    }

    fn write_value(
        &mut self,
        table: &str,
        row: usize,
        column: usize,
        value: TableValue,
    ) -> Result<()> {
        if column == INDEX_COLUMN {
            bail!("column {INDEX_COLUMN} of table '{table}' holds the record index");
        }
        let width = self.existing(table)?.columns.len();
        if column > width {
            bail!("column {column} is outside table '{table}' ({width} columns)");
        }
        let stored = self.row_mut(table, row)?;
        if stored.values.len() < width {
            stored.values.resize(width, None);
        }
        stored.values[column - 1] = Some(value);
        Ok(())
    }
}

impl TableSource for Workbook {
    fn table_names(&self) -> Vec<String> {
        self.sheets.keys().cloned().collect()
    }

    fn header(&self, table: &str) -> Result<Vec<FieldKey>> {
        Ok(self.existing(table)?.columns.clone())
    }

    fn row_count(&self, table: &str) -> Result<usize> {
        Ok(self.existing(table)?.rows.len())
    }

    fn read_row(&self, table: &str, row: usize) -> Result<TableRow> {
        let sheet = self.existing(table)?;
        let stored = sheet
            .rows
            .get(row)
            .ok_or_else(|| anyhow!("table '{table}' has no data row {row}"))?;
        let index = stored
            .index
            .clone()
            .ok_or_else(|| anyhow!("data row {row} of table '{table}' has no record index"))?;
        let mut values = stored.values.clone();
        values.resize(sheet.columns.len(), None);
        Ok(TableRow { index, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Vec<FieldKey> {
        names.iter().map(|n| FieldKey::from(*n)).collect()
    }

    #[test]
    fn test_write_and_read_back() {
        let mut book = Workbook::new(0);
        book.create_table("main", &keys(&["a", "b"])).unwrap();
        book.write_index("main", 1, &RecordIndex::from("1")).unwrap();
        book.write_value("main", 1, 2, TableValue::Bool(true)).unwrap();

        let row = book.read_row("main", 0).unwrap();
        assert_eq!(row.index.as_str(), "1");
        assert_eq!(row.values, vec![None, Some(TableValue::Bool(true))]);
        assert_eq!(book.sheet("main").unwrap().value(0, "b"), Some(&TableValue::Bool(true)));
    }

    #[test]
    fn test_header_row_offset() {
        let mut book = Workbook::new(2);
        book.create_table("t", &keys(&["x"])).unwrap();
        assert!(book.write_index("t", 2, &RecordIndex::from("1")).is_err());
        book.write_index("t", 4, &RecordIndex::from("2")).unwrap();

        assert_eq!(book.row_count("t").unwrap(), 2);
        assert_eq!(book.sheet("t").unwrap().indices(), vec![None, Some("2")]);
        // Row 3 was never written
        assert!(book.read_row("t", 0).is_err());
    }

    #[test]
    fn test_index_column_is_reserved() {
        let mut book = Workbook::new(0);
        book.create_table("t", &keys(&["x"])).unwrap();
        assert!(book.write_value("t", 1, 0, TableValue::Null).is_err());
        assert!(book.write_value("t", 1, 2, TableValue::Null).is_err());
        assert!(book.write_value("missing", 1, 1, TableValue::Null).is_err());
    }

    #[test]
    fn test_duplicate_table() {
        let mut book = Workbook::new(0);
        book.create_table("t", &[]).unwrap();
        assert!(book.create_table("t", &[]).is_err());
        assert_eq!(book.table_names(), vec!["t".to_string()]);
    }
}
