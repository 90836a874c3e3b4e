//! Reading records back from tables
//!
//! Every table is scanned top to bottom by its own cursor. A record is
//! assembled from the rows of all tables whose Record Index starts with the
//! record's ordinal, so the rows of one record must be contiguous in each
//! table, which is how [`TableWriter`](crate::table::TableWriter) lays
//! them out. A record whose rows turn up again later is an error.
//!
//! Columns keep first-seen order across the whole collection, so a row may
//! list `d-1` before `d-0`; [`Unflattener`] puts cells back in document
//! order before rebuilding.

use crate::codec::{rename_keys, RenameMap, Unflattener};
use crate::key::FieldKey;
use crate::schema::Schema;
use crate::table::{TableRow, TableSource};
use crate::types::{Cell, CodecConfig};
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

/// What the next call to the reader will produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookahead {
    /// Smallest ordinal still waiting in any table
    Record(usize),
    NoMoreRecord,
}

struct SheetCursor {
    table: String,
    columns: Vec<FieldKey>,
    // Marker emitted for rows that carry an index and nothing else
    marker: Option<FieldKey>,
    row_count: usize,
    next_row: usize,
    pending: Option<(usize, TableRow)>,
}

impl SheetCursor {
    fn peek<T: TableSource + ?Sized>(&mut self, source: &T) -> Result<Option<usize>> {
        if self.pending.is_none() && self.next_row < self.row_count {
            let row = self.next_row;
            // Advance first so a failing row is not retried forever
            self.next_row += 1;
            let read = source
                .read_row(&self.table, row)
                .with_context(|| format!("Failed to read row {row} of '{}'", self.table))?;
            let ordinal = read
                .index
                .ordinal()
                .with_context(|| format!("Bad record index in row {row} of '{}'", self.table))?;
            self.pending = Some((ordinal, read));
        }
        Ok(self.pending.as_ref().map(|(ordinal, _)| *ordinal))
    }

    /// Move every row of `ordinal` into `cells`.
    fn take_record<T: TableSource + ?Sized>(
        &mut self,
        source: &T,
        ordinal: usize,
        cells: &mut Vec<Cell>,
    ) -> Result<()> {
        while self.peek(source)? == Some(ordinal) {
            let Some((_, row)) = self.pending.take() else {
                break;
            };
            self.push_cells(row, cells);
        }
        Ok(())
    }

    fn push_cells(&self, row: TableRow, cells: &mut Vec<Cell>) {
        let before = cells.len();
        for (key, value) in self.columns.iter().zip(row.values) {
            if let Some(value) = value {
                cells.push(Cell::new(key.clone(), row.index.clone(), value.into_cell()));
            }
        }
        if cells.len() == before {
            if let Some(marker) = &self.marker {
                cells.push(Cell::empty_list(marker.clone(), row.index));
            }
        }
    }
}

/// Iterator over the records stored in a [`TableSource`]
pub struct RecordReader<'a, T: TableSource + ?Sized> {
    source: &'a T,
    schema: Schema,
    cursors: Vec<SheetCursor>,
    next_ordinal: usize,
    renames: Option<&'a RenameMap>,
}

impl<'a, T: TableSource + ?Sized> RecordReader<'a, T> {
    /// Open every table of `source` and rebuild the schema from the headers.
    pub fn new(source: &'a T, config: &CodecConfig) -> Result<Self> {
        let mut tables = Vec::new();
        let mut cursors = Vec::new();
        for table in source.table_names() {
            let columns = source
                .header(&table)
                .with_context(|| format!("Failed to read header of '{table}'"))?;
            let row_count = source.row_count(&table)?;
            let marker = (table != config.root_group)
                .then(|| FieldKey::from(table.as_str()).empty_marker());

            tables.push((table.clone(), columns.clone()));
            cursors.push(SheetCursor {
                table,
                columns,
                marker,
                row_count,
                next_row: 0,
                pending: None,
            });
        }

        let schema = Schema::from_tables(config.root_group.as_str(), tables);
        debug!(
            tables = cursors.len(),
            keys = schema.len(),
            "opened tables for reading"
        );

        Ok(RecordReader {
            source,
            schema,
            cursors,
            next_ordinal: config.first_ordinal,
            renames: None,
        })
    }

    /// Rename fields of every record after it is rebuilt.
    pub fn with_renames(mut self, renames: &'a RenameMap) -> Self {
        self.renames = Some(renames);
        self
    }

    /// Rebuild records with `schema` instead of the one recovered from the
    /// headers. Headers cannot say which group sat inside which, so the
    /// schema returned by an export places cells in cases the headers leave
    /// ambiguous.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Schema used to rebuild records
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Smallest record ordinal still unread in any table.
    pub fn lookahead(&mut self) -> Result<Lookahead> {
        let mut smallest: Option<usize> = None;
        for cursor in &mut self.cursors {
            if let Some(ordinal) = cursor.peek(self.source)? {
                smallest = Some(smallest.map_or(ordinal, |s| s.min(ordinal)));
            }
        }
        Ok(match smallest {
            Some(ordinal) => Lookahead::Record(ordinal),
            None => Lookahead::NoMoreRecord,
        })
    }

    fn read_record(&mut self, ordinal: usize) -> Result<Value> {
        let mut cells = Vec::new();
        for cursor in &mut self.cursors {
            cursor.take_record(self.source, ordinal, &mut cells)?;
        }
        trace!(ordinal, cells = cells.len(), "rebuilding record");

        let mut record = Unflattener::new(&self.schema)
            .unflatten(cells)
            .with_context(|| format!("Failed to rebuild record {ordinal}"))?;
        if let Some(renames) = self.renames {
            rename_keys(&mut record, renames);
        }
        Ok(record)
    }
}

impl<T: TableSource + ?Sized> Iterator for RecordReader<'_, T> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let ordinal = match self.lookahead() {
            Ok(Lookahead::Record(ordinal)) => ordinal,
            Ok(Lookahead::NoMoreRecord) => return None,
            Err(err) => return Some(Err(err)),
        };

        if ordinal < self.next_ordinal {
            // Consume the stray rows so the reader can move on
            let mut stray = Vec::new();
            for cursor in &mut self.cursors {
                if let Err(err) = cursor.take_record(self.source, ordinal, &mut stray) {
                    return Some(Err(err));
                }
            }
            warn!(ordinal, cells = stray.len(), "rows of a record are not contiguous");
            return Some(Err(anyhow!(
                "record {ordinal} is out of order, expected {} or later; rows of one record must be contiguous",
                self.next_ordinal
            )));
        }

        if ordinal > self.next_ordinal {
            // Records without a single cell left no rows behind
            trace!(ordinal = self.next_ordinal, "filling gap with an empty record");
            self.next_ordinal += 1;
            return Some(Ok(Value::Object(Map::new())));
        }

        self.next_ordinal = ordinal + 1;
        let record = self.read_record(ordinal);
        if let Err(err) = &record {
            debug!(ordinal, "{err:#}");
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::RecordIndex;
    use crate::table::{TableSink, TableValue, Workbook};
    use serde_json::json;

    fn config() -> CodecConfig {
        CodecConfig::default()
    }

    #[test]
    fn test_empty_source() {
        let book = Workbook::new(0);
        let mut reader = RecordReader::new(&book, &config()).unwrap();
        assert_eq!(reader.lookahead().unwrap(), Lookahead::NoMoreRecord);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_rows_of_all_tables_join() {
        let mut book = Workbook::new(0);
        book.create_table("main", &[FieldKey::from("a")]).unwrap();
        book.create_table("e", &[FieldKey::from("e.f")]).unwrap();
        book.write_index("main", 1, &RecordIndex::from("1")).unwrap();
        book.write_value("main", 1, 1, TableValue::Number(1.into())).unwrap();
        book.write_index("e", 1, &RecordIndex::from("1-0")).unwrap();
        book.write_value("e", 1, 1, TableValue::Number(5.into())).unwrap();
        book.write_index("e", 2, &RecordIndex::from("1-1")).unwrap();
        book.write_value("e", 2, 1, TableValue::Number(6.into())).unwrap();

        let records: Vec<Value> = RecordReader::new(&book, &config())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records, vec![json!({"a": 1, "e": [{"f": 5}, {"f": 6}]})]);
    }

    #[test]
    fn test_gaps_become_empty_records() {
        let mut book = Workbook::new(0);
        book.create_table("main", &[FieldKey::from("a")]).unwrap();
        book.write_index("main", 1, &RecordIndex::from("1")).unwrap();
        book.write_value("main", 1, 1, TableValue::Bool(true)).unwrap();
        book.write_index("main", 2, &RecordIndex::from("3")).unwrap();
        book.write_value("main", 2, 1, TableValue::Bool(false)).unwrap();

        let mut reader = RecordReader::new(&book, &config()).unwrap();
        assert_eq!(reader.lookahead().unwrap(), Lookahead::Record(1));
        let records: Vec<Value> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(records, vec![json!({"a": true}), json!({}), json!({"a": false})]);
    }

    #[test]
    fn test_index_only_row_is_an_empty_group() {
        let mut book = Workbook::new(0);
        book.create_table("main", &[FieldKey::from("a")]).unwrap();
        book.create_table("e", &[FieldKey::from("e.f")]).unwrap();
        book.write_index("main", 1, &RecordIndex::from("1")).unwrap();
        book.write_value("main", 1, 1, TableValue::Number(1.into())).unwrap();
        book.write_index("e", 1, &RecordIndex::from("1")).unwrap();

        let records: Vec<Value> = RecordReader::new(&book, &config())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records, vec![json!({"a": 1, "e": []})]);
    }

    #[test]
    fn test_renames_applied_after_rebuild() {
        let mut book = Workbook::new(0);
        book.create_table("main", &[FieldKey::from("a_a")]).unwrap();
        book.write_index("main", 1, &RecordIndex::from("1")).unwrap();
        book.write_value("main", 1, 1, TableValue::Number(1.into())).unwrap();

        let renames: RenameMap = [("a_a", "a-a")].into_iter().collect();
        let records: Vec<Value> = RecordReader::new(&book, &config())
            .unwrap()
            .with_renames(&renames)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records, vec![json!({"a-a": 1})]);
    }

    #[test]
    fn test_row_cells_follow_positions_not_columns() {
        let mut book = Workbook::new(0);
        let columns = [FieldKey::from("d-0-0"), FieldKey::from("d-1"), FieldKey::from("d-0")];
        book.create_table("main", &columns).unwrap();
        book.write_index("main", 1, &RecordIndex::from("1")).unwrap();
        book.write_value("main", 1, 1, TableValue::Number(1.into())).unwrap();
        book.write_value("main", 1, 2, TableValue::Number(2.into())).unwrap();
        book.write_index("main", 2, &RecordIndex::from("2")).unwrap();
        book.write_value("main", 2, 2, TableValue::Number(4.into())).unwrap();
        book.write_value("main", 2, 3, TableValue::Number(3.into())).unwrap();

        let records: Vec<Value> = RecordReader::new(&book, &config())
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records, vec![json!({"d": [[1], 2]}), json!({"d": [3, 4]})]);
    }

    #[test]
    fn test_record_rows_out_of_order() {
        let mut book = Workbook::new(0);
        book.create_table("main", &[FieldKey::from("a")]).unwrap();
        for (row, (index, value)) in [("1", 1i64), ("2", 2), ("1", 3)].into_iter().enumerate() {
            book.write_index("main", row + 1, &RecordIndex::from(index)).unwrap();
            book.write_value("main", row + 1, 1, TableValue::Number(value.into())).unwrap();
        }

        let mut reader = RecordReader::new(&book, &config()).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), json!({"a": 1}));
        assert_eq!(reader.next().unwrap().unwrap(), json!({"a": 2}));
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_malformed_index_is_reported() {
        let mut book = Workbook::new(0);
        book.create_table("main", &[FieldKey::from("a")]).unwrap();
        book.write_index("main", 1, &RecordIndex::from("x")).unwrap();

        let mut reader = RecordReader::new(&book, &config()).unwrap();
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }
}
