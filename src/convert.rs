//! Whole-collection conversion
//!
//! [`ToTables`] runs group discovery and then writes every document, so the
//! document source is traversed twice. [`FromTables`] reads records back.

use crate::codec::{flatten, normalize_keys, rename_keys, RenameMap};
use crate::error::CodecError;
use crate::key::{FieldKey, RecordIndex};
use crate::schema::{Schema, SchemaBuilder};
use crate::table::{RecordReader, TableSink, TableSource, TableWriter};
use crate::types::CodecConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::{debug, info};

/// A re-iterable collection of documents
pub trait DocumentSource {
    fn documents(&self) -> Box<dyn Iterator<Item = &Value> + '_>;
}

impl DocumentSource for [Value] {
    fn documents(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        Box::new(self.iter())
    }
}

impl DocumentSource for Vec<Value> {
    fn documents(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        Box::new(self.iter())
    }
}

/// Outcome of [`ToTables::write`]
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Schema the tables were written with
    pub schema: Schema,
    pub records: usize,
    /// Cells left out because discovery never saw their key
    pub dropped: usize,
    /// Undoes key normalization; empty unless it was enabled
    pub restore: RenameMap,
}

/// Documents to tables
#[derive(Debug, Clone, Default)]
pub struct ToTables {
    config: CodecConfig,
    selection: Option<HashSet<FieldKey>>,
    renames: Option<RenameMap>,
    normalize: bool,
}

impl ToTables {
    pub fn new(config: CodecConfig) -> Self {
        ToTables {
            config,
            ..Default::default()
        }
    }

    /// Only export these Field Keys.
    pub fn select<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<FieldKey>,
    {
        self.selection = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Rename fields before flattening.
    pub fn rename(mut self, renames: RenameMap) -> Self {
        self.renames = Some(renames);
        self
    }

    /// Replace separator characters in field names before flattening.
    pub fn normalize_keys(mut self) -> Self {
        self.normalize = true;
        self
    }

    fn prepare<'d>(&self, document: &'d Value, restore: &mut RenameMap) -> Cow<'d, Value> {
        if self.renames.is_none() && !self.normalize {
            return Cow::Borrowed(document);
        }
        let mut document = document.clone();
        if let Some(renames) = &self.renames {
            rename_keys(&mut document, renames);
        }
        if self.normalize {
            restore.merge(normalize_keys(&mut document, self.config.key_replacement));
        }
        Cow::Owned(document)
    }

    /// Discover the schema, honoring the sample size and key selection.
    pub fn discover<D: DocumentSource + ?Sized>(&self, documents: &D) -> Schema {
        let limit = self.config.sample_size.unwrap_or(usize::MAX);
        let mut builder = SchemaBuilder::new(self.config.root_group.as_str());
        let mut scratch = RenameMap::new();
        for document in documents.documents().take(limit) {
            builder.add_document(&self.prepare(document, &mut scratch));
        }
        let schema = builder.build();

        match &self.selection {
            Some(selected) => schema.restrict(selected),
            None => schema,
        }
    }

    /// Discover, then write every document to `sink`.
    pub fn write<D, S>(&self, documents: &D, sink: &mut S) -> Result<ExportSummary>
    where
        D: DocumentSource + ?Sized,
        S: TableSink + ?Sized,
    {
        let schema = self.discover(documents);
        // Restricted schemas also carry the markers of surviving groups
        let wanted: Option<HashSet<FieldKey>> = self
            .selection
            .as_ref()
            .map(|_| schema.keys().map(|(key, _)| key.clone()).collect());

        let mut restore = RenameMap::new();
        let mut records = 0;
        let mut writer = TableWriter::new(&schema, sink, self.config.header_row)?;
        for (offset, document) in documents.documents().enumerate() {
            let ordinal = self.config.first_ordinal + offset;
            let document = self.prepare(document, &mut restore);
            if !document.is_object() {
                return Err(CodecError::NotAnObject { ordinal }.into());
            }

            let cells = flatten(&document, RecordIndex::record(ordinal));
            let written = match &wanted {
                Some(wanted) => writer.write_cells(cells.filter(|cell| wanted.contains(&cell.key))),
                None => writer.write_cells(cells),
            };
            written.with_context(|| format!("Failed to write record {ordinal}"))?;
            records += 1;
        }
        let dropped = writer.finish();

        if records == 0 {
            debug!("document source is empty");
        }
        info!(records, groups = schema.groups().count(), "wrote tables");

        Ok(ExportSummary {
            schema,
            records,
            dropped,
            restore,
        })
    }
}

/// Tables to documents
#[derive(Debug, Clone, Default)]
pub struct FromTables {
    config: CodecConfig,
    renames: Option<RenameMap>,
    schema: Option<Schema>,
}

impl FromTables {
    pub fn new(config: CodecConfig) -> Self {
        FromTables {
            config,
            renames: None,
            schema: None,
        }
    }

    /// Rebuild records with the schema an export returned rather than the
    /// one recovered from the table headers.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Rename fields of every record after it is rebuilt.
    pub fn rename(mut self, renames: RenameMap) -> Self {
        self.renames = Some(renames);
        self
    }

    /// Lazily read records from `source`.
    pub fn records<'a, T>(&'a self, source: &'a T) -> Result<RecordReader<'a, T>>
    where
        T: TableSource + ?Sized,
    {
        let mut reader = RecordReader::new(source, &self.config)?;
        if let Some(schema) = &self.schema {
            reader = reader.with_schema(schema.clone());
        }
        Ok(match &self.renames {
            Some(renames) => reader.with_renames(renames),
            None => reader,
        })
    }

    /// Read every record, stopping at the first error.
    pub fn read_all<T: TableSource + ?Sized>(&self, source: &T) -> Result<Vec<Value>> {
        self.records(source)?.collect()
    }
}
