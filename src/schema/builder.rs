//! Group discovery with a streaming accumulator
//!
//! Documents are added one at a time; each walk follows the same rules as
//! flattening but records `(group, key)` pairs instead of values. The first
//! group seen for a key wins. The schema is only assembled once, in
//! [`SchemaBuilder::build`], where empty-collection markers of nested arrays
//! of objects are folded into their own group.

use crate::key::{join_position, FieldKey};
use crate::schema::Schema;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Accumulates group assignments over a stream of documents
#[derive(Debug)]
pub struct SchemaBuilder {
    root: String,
    // Key to group, first occurrence wins
    keys: IndexMap<FieldKey, String>,
    // Every array-of-objects path seen so far
    groups: IndexSet<String>,
    // Groups each group was found directly inside
    parents: IndexMap<String, IndexSet<String>>,
    // Keys found in more than one group
    roaming: IndexSet<FieldKey>,
    // Keys produced by an empty array, and keys that carried a value
    markers: HashSet<FieldKey>,
    values: HashSet<FieldKey>,
    document_count: usize,
}

impl SchemaBuilder {
    /// Create a builder whose top-level fields land in the `root` group
    pub fn new(root: impl Into<String>) -> Self {
        SchemaBuilder {
            root: root.into(),
            keys: IndexMap::new(),
            groups: IndexSet::new(),
            parents: IndexMap::new(),
            roaming: IndexSet::new(),
            markers: HashSet::new(),
            values: HashSet::new(),
            document_count: 0,
        }
    }

    /// Number of documents added so far
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// Add one document, recording the group of every key it contains
    pub fn add_document(&mut self, document: &Value) {
        self.document_count += 1;
        let root = self.root.clone();
        self.walk(document, &FieldKey::default(), &root);
    }

    fn walk(&mut self, value: &Value, key: &FieldKey, group: &str) {
        match value {
            Value::Object(obj) => {
                for (name, child) in obj.iter() {
                    self.walk(child, &key.child(name), group);
                }
            }
            Value::Array(arr) if arr.is_empty() => {
                let marker = key.empty_marker();
                self.markers.insert(marker.clone());
                self.record(marker, group);
            }
            Value::Array(arr) => {
                for (position, element) in arr.iter().enumerate() {
                    if element.is_object() {
                        // The array's own key names the group of everything inside
                        self.groups.insert(key.to_string());
                        self.parents
                            .entry(key.to_string())
                            .or_default()
                            .insert(group.to_string());
                        self.walk(element, key, key.as_str());
                    } else {
                        self.walk(element, &key.position(position), group);
                    }
                }
            }
            _ => {
                self.values.insert(key.clone());
                self.record(key.clone(), group);
            }
        }
    }

    fn record(&mut self, key: FieldKey, group: &str) {
        match self.keys.get(&key) {
            Some(first) if first != group => {
                self.roaming.insert(key);
            }
            Some(_) => {}
            None => {
                self.keys.insert(key, group.to_string());
            }
        }
    }

    /// Build the final schema
    pub fn build(self) -> Schema {
        let SchemaBuilder {
            root,
            mut keys,
            groups,
            parents,
            roaming,
            markers,
            values,
            document_count,
        } = self;

        // "e-0" stands for "array e was empty"; when e is itself a group the
        // marker belongs to that group rather than to a data column. A key
        // that also held a scalar somewhere stays a column.
        let suffix = join_position("", 0);
        for (key, group) in keys.iter_mut() {
            if !markers.contains(key) || values.contains(key) {
                continue;
            }
            if let Some(base) = key.as_str().strip_suffix(suffix.as_str()) {
                if groups.contains(base) {
                    *group = base.to_string();
                }
            }
        }

        if document_count == 0 {
            debug!("group discovery saw no documents");
        }
        debug!(
            documents = document_count,
            groups = groups.len(),
            keys = keys.len(),
            "schema discovered"
        );

        Schema::from_parts(root, keys, groups, parents, roaming)
    }
}

/// Discover the schema of a document collection in one pass
pub fn discover<'a, I>(documents: I, root: &str) -> Schema
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut builder = SchemaBuilder::new(root);
    for document in documents {
        builder.add_document(document);
    }
    builder.build()
}
