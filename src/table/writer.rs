use crate::key::FieldKey;
use crate::schema::Schema;
use crate::table::{RowAssigner, TableSink, TableValue, INDEX_COLUMN};
use crate::types::Cell;
use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Writes cells into one table per schema group
pub struct TableWriter<'a, S: TableSink + ?Sized> {
    schema: &'a Schema,
    sink: &'a mut S,
    tables: HashMap<String, TableState>,
    dropped: usize,
}

struct TableState {
    columns: HashMap<FieldKey, usize>,
    rows: RowAssigner,
}

impl<'a, S: TableSink + ?Sized> TableWriter<'a, S> {
    /// Create every table of `schema` in `sink`, headers included.
    pub fn new(schema: &'a Schema, sink: &'a mut S, header_row: usize) -> Result<Self> {
        let mut tables = HashMap::new();
        for group in schema.groups() {
            let columns: Vec<FieldKey> = schema.columns(group).into_iter().cloned().collect();
            sink.create_table(group, &columns)
                .with_context(|| format!("Failed to create table '{group}'"))?;
            debug!(table = group, columns = columns.len(), "created table");

            let columns = columns
                .into_iter()
                .enumerate()
                .map(|(i, key)| (key, INDEX_COLUMN + 1 + i))
                .collect();
            tables.insert(
                group.to_string(),
                TableState {
                    columns,
                    rows: RowAssigner::new(header_row),
                },
            );
        }

        Ok(TableWriter {
            schema,
            sink,
            tables,
            dropped: 0,
        })
    }

    /// Write one cell. Cells whose key the schema does not know are dropped.
    pub fn write_cell(&mut self, cell: Cell) -> Result<()> {
        let schema = self.schema;
        let group = match schema.resolve(&cell.key) {
            Ok(group) => group,
            Err(err) => {
                debug!(index = %cell.index, "{err}, dropping cell");
                self.dropped += 1;
                return Ok(());
            }
        };

        let Some(table) = self.tables.get_mut(group) else {
            anyhow::bail!("group '{group}' of key '{}' has no table", cell.key);
        };

        let row = table.rows.row_for(&cell.index);
        self.sink
            .write_index(group, row, &cell.index)
            .with_context(|| format!("Failed to write index {} to '{group}'", cell.index))?;

        // A folded marker only needs its row
        if let Some(&column) = table.columns.get(&cell.key) {
            self.sink
                .write_value(group, row, column, TableValue::from(cell.value))
                .with_context(|| format!("Failed to write '{}' at {}", cell.key, cell.index))?;
        }
        Ok(())
    }

    pub fn write_cells<I>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = Cell>,
    {
        for cell in cells {
            self.write_cell(cell)?;
        }
        Ok(())
    }

    /// Finish writing and report how many cells were dropped
    pub fn finish(self) -> usize {
        if self.dropped > 0 {
            warn!(
                dropped = self.dropped,
                "cells with keys outside the schema were not written"
            );
        }
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::flatten;
    use crate::key::RecordIndex;
    use crate::schema::discover;
    use crate::table::Workbook;
    use serde_json::json;

    #[test]
    fn test_rows_per_group() {
        let document = json!({"a": 1, "e": [{"f": 5, "g": 6}, {"f": 100, "g": 120}]});
        let schema = discover([&document], "main");
        let mut book = Workbook::new(0);

        let mut writer = TableWriter::new(&schema, &mut book, 0).unwrap();
        writer
            .write_cells(flatten(&document, RecordIndex::record(1)))
            .unwrap();
        assert_eq!(writer.finish(), 0);

        let main = book.sheet("main").unwrap();
        assert_eq!(main.indices(), vec![Some("1")]);
        assert_eq!(main.value(0, "a"), Some(&TableValue::Number(1.into())));

        let e = book.sheet("e").unwrap();
        assert_eq!(e.indices(), vec![Some("1-0"), Some("1-1")]);
        assert_eq!(e.value(1, "e.g"), Some(&TableValue::Number(120.into())));
    }

    #[test]
    fn test_unknown_keys_are_dropped() {
        let schema = discover([&json!({"a": 1})], "main");
        let mut book = Workbook::new(0);
        let mut writer = TableWriter::new(&schema, &mut book, 0).unwrap();

        writer
            .write_cells(flatten(&json!({"a": 2, "b": 3}), RecordIndex::record(1)))
            .unwrap();
        assert_eq!(writer.finish(), 1);
        assert_eq!(book.sheet("main").unwrap().columns, vec![FieldKey::from("a")]);
    }

    #[test]
    fn test_folded_marker_writes_index_only() {
        let documents = [json!({"e": [{"f": 1}]}), json!({"e": []})];
        let schema = discover(&documents, "main");
        let mut book = Workbook::new(0);
        let mut writer = TableWriter::new(&schema, &mut book, 0).unwrap();
        for (offset, document) in documents.iter().enumerate() {
            writer
                .write_cells(flatten(document, RecordIndex::record(offset + 1)))
                .unwrap();
        }
        writer.finish();

        let e = book.sheet("e").unwrap();
        assert_eq!(e.indices(), vec![Some("1-0"), Some("2")]);
        assert_eq!(e.value(1, "e.f"), None);
    }
}
