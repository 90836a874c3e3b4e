//! Field renaming
//!
//! A [`RenameMap`] maps a dotted path to the new name of its last segment.
//! Parent segments address Object fields by name; arrays along the way are
//! entered transparently, so a path reaches every element of every array it
//! crosses. Entries are applied deepest path first, which lets a child be
//! renamed under its parent's old name before the parent itself changes.

use crate::key::{join_field, split_field, BRANCH_SEPARATOR, FIELD_SEPARATOR};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Path to new leaf name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenameMap(IndexMap<String, String>);

impl RenameMap {
    pub fn new() -> Self {
        RenameMap::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, leaf: impl Into<String>) {
        self.0.insert(path.into(), leaf.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(p, l)| (p.as_str(), l.as_str()))
    }

    /// Add every entry of `other`; later entries win.
    pub fn merge(&mut self, other: RenameMap) {
        self.0.extend(other.0);
    }
}

impl<P: Into<String>, L: Into<String>> FromIterator<(P, L)> for RenameMap {
    fn from_iter<I: IntoIterator<Item = (P, L)>>(iter: I) -> Self {
        RenameMap(iter.into_iter().map(|(p, l)| (p.into(), l.into())).collect())
    }
}

/// Rename fields of `document` in place. Paths that match nothing are ignored.
pub fn rename_keys(document: &mut Value, renames: &RenameMap) {
    let mut entries: Vec<(Vec<&str>, &str)> = renames
        .iter()
        .map(|(path, leaf)| (split_field(path), leaf))
        .filter(|(segments, _)| !segments.is_empty())
        .collect();
    // Stable, so equal depths keep map order
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    for (segments, leaf) in entries {
        if let Some((old, parents)) = segments.split_last() {
            rename_at(document, parents, old, leaf);
        }
    }
}

fn rename_at(value: &mut Value, parents: &[&str], old: &str, new: &str) {
    match value {
        Value::Array(items) => {
            for item in items {
                rename_at(item, parents, old, new);
            }
        }
        Value::Object(obj) => match parents.split_first() {
            None => rename_field(obj, old, new),
            Some((first, rest)) => {
                if let Some(child) = obj.get_mut(*first) {
                    rename_at(child, rest, old, new);
                }
            }
        },
        _ => {}
    }
}

// Rebuilds the map so the renamed field keeps its place
fn rename_field(obj: &mut Map<String, Value>, old: &str, new: &str) {
    if old == new || !obj.contains_key(old) {
        return;
    }
    let fields = std::mem::take(obj);
    for (name, value) in fields {
        if name == old {
            obj.insert(new.to_string(), value);
        } else {
            obj.insert(name, value);
        }
    }
}

/// Replace both separators in every field name with `replacement`.
///
/// Returns the map that undoes the change: normalized path to original name.
/// Feeding it to [`rename_keys`] after a table round-trip restores the
/// original field names.
pub fn normalize_keys(document: &mut Value, replacement: char) -> RenameMap {
    let mut restore = RenameMap::new();
    normalize_at(document, "", &replacement.to_string(), &mut restore);
    restore
}

fn normalize_at(value: &mut Value, path: &str, replacement: &str, restore: &mut RenameMap) {
    const SEPARATORS: [char; 2] = [FIELD_SEPARATOR, BRANCH_SEPARATOR];

    match value {
        Value::Array(items) => {
            for item in items {
                normalize_at(item, path, replacement, restore);
            }
        }
        Value::Object(obj) => {
            if obj.keys().any(|name| name.contains(SEPARATORS)) {
                let fields = std::mem::take(obj);
                for (name, child) in fields {
                    let clean = name.replace(SEPARATORS, replacement);
                    if clean != name {
                        restore.insert(join_field(path, &clean), name);
                    }
                    obj.insert(clean, child);
                }
            }
            for (name, child) in obj.iter_mut() {
                normalize_at(child, &join_field(path, name), replacement, restore);
            }
        }
        _ => {}
    }
}
