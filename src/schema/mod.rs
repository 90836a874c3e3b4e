//! Tabular schema
//!
//! A [`Schema`] maps every Field Key to the group (table) it is written to,
//! and remembers every array-of-objects path seen during discovery together
//! with the groups it was found directly inside. Columns of a group keep
//! first-seen order.

pub mod builder;

pub use builder::{discover, SchemaBuilder};

use crate::error::{CodecError, Result};
use crate::key::{join_position, FieldKey, BRANCH_SEPARATOR, FIELD_SEPARATOR};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Field Key to group assignment plus the set of known groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    root: String,
    keys: IndexMap<FieldKey, String>,
    /// Array-of-objects paths, root excluded
    groups: IndexSet<String>,
    /// Group to the groups it sat directly inside, the root included
    #[serde(default)]
    parents: IndexMap<String, IndexSet<String>>,
    /// Keys found in more than one group; their group says nothing about
    /// where a given cell sat
    #[serde(default)]
    roaming: IndexSet<FieldKey>,
}

impl Schema {
    /// An empty schema with only the root group.
    pub fn new(root: impl Into<String>) -> Self {
        Schema {
            root: root.into(),
            keys: IndexMap::new(),
            groups: IndexSet::new(),
            parents: IndexMap::new(),
            roaming: IndexSet::new(),
        }
    }

    pub(crate) fn from_parts(
        root: String,
        keys: IndexMap<FieldKey, String>,
        groups: IndexSet<String>,
        parents: IndexMap<String, IndexSet<String>>,
        roaming: IndexSet<FieldKey>,
    ) -> Self {
        Schema {
            root,
            keys,
            groups,
            parents,
            roaming,
        }
    }

    /// Rebuild a schema from table names and headers, as read back from a
    /// tabular store. The table named like the root group holds root keys.
    ///
    /// Tables do not record which group held which, so every group is taken
    /// to possibly sit inside the root or inside any group its path extends,
    /// and every key is taken to live in its own table only.
    pub fn from_tables<I>(root: impl Into<String>, tables: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<FieldKey>)>,
    {
        let mut schema = Schema::new(root);
        for (table, columns) in tables {
            for key in columns {
                schema.keys.entry(key).or_insert_with(|| table.clone());
            }
            if table != schema.root {
                schema.groups.insert(table);
            }
        }

        let parents = schema
            .groups
            .iter()
            .map(|group| {
                let mut enclosing = IndexSet::new();
                enclosing.insert(schema.root.clone());
                enclosing.extend(
                    schema
                        .groups
                        .iter()
                        .filter(|outer| lies_below(group, outer))
                        .cloned(),
                );
                (group.clone(), enclosing)
            })
            .collect();
        schema.parents = parents;
        schema
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn group_of(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    /// Group of `key` when every occurrence of it was found there.
    pub fn home_of(&self, key: &str) -> Option<&str> {
        if self.roaming.contains(key) {
            return None;
        }
        self.group_of(key)
    }

    /// Group of `key`, or [`CodecError::UnknownGroup`].
    pub fn resolve(&self, key: &FieldKey) -> Result<&str> {
        self.group_of(key.as_str())
            .ok_or_else(|| CodecError::UnknownGroup { key: key.to_string() })
    }

    /// True when `path` is an array-of-objects field.
    pub fn is_group(&self, path: &str) -> bool {
        self.groups.contains(path)
    }

    /// True when group `child` was found directly inside `parent`, which may
    /// be the root group.
    pub fn encloses(&self, parent: &str, child: &str) -> bool {
        self.parents
            .get(child)
            .is_some_and(|enclosing| enclosing.contains(parent))
    }

    /// Root group first, then groups in discovery order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.root.as_str()).chain(
            self.groups
                .iter()
                .map(String::as_str)
                .filter(move |g| *g != self.root),
        )
    }

    /// Every key with its group, in discovery order.
    pub fn keys(&self) -> impl Iterator<Item = (&FieldKey, &str)> {
        self.keys.iter().map(|(k, g)| (k, g.as_str()))
    }

    /// Data columns of `group`, in discovery order. The group's own
    /// empty-collection marker is not a column.
    pub fn columns(&self, group: &str) -> Vec<&FieldKey> {
        self.keys
            .iter()
            .filter(|(key, g)| g.as_str() == group && !self.is_group_marker(key.as_str()))
            .map(|(key, _)| key)
            .collect()
    }

    /// True when `key` is `{group}-0` and has been folded into that group.
    pub fn is_group_marker(&self, key: &str) -> bool {
        self.marker_group(key)
            .is_some_and(|group| self.group_of(key) == Some(group))
    }

    /// The group whose empty-collection marker is `key`, if any.
    pub fn marker_group<'k>(&self, key: &'k str) -> Option<&'k str> {
        let suffix = join_position("", 0);
        key.strip_suffix(suffix.as_str())
            .filter(|base| self.is_group(base))
    }

    /// Keys offered for selective export: sorted, markers left out.
    pub fn selectable_keys(&self) -> Vec<&FieldKey> {
        let mut keys: Vec<&FieldKey> = self
            .keys
            .keys()
            .filter(|key| !self.is_group_marker(key.as_str()))
            .collect();
        keys.sort();
        keys
    }

    /// Restrict to `selected` keys. Groups survive when some selected key
    /// lies below them, so the read path still knows where the arrays are.
    pub fn restrict(&self, selected: &HashSet<FieldKey>) -> Schema {
        let mut keys: IndexMap<FieldKey, String> = self
            .keys
            .iter()
            .filter(|(key, _)| selected.contains(*key))
            .map(|(key, group)| (key.clone(), group.clone()))
            .collect();

        let groups: IndexSet<String> = self
            .groups
            .iter()
            .filter(|group| keys.keys().any(|key| lies_below(key.as_str(), group)))
            .cloned()
            .collect();

        // Surviving groups keep their markers so empty arrays still come back
        for (key, group) in &self.keys {
            if groups.contains(group) && self.is_group_marker(key.as_str()) {
                keys.entry(key.clone()).or_insert_with(|| group.clone());
            }
        }

        let parents = self
            .parents
            .iter()
            .filter(|(group, _)| groups.contains(*group))
            .map(|(group, enclosing)| (group.clone(), enclosing.clone()))
            .collect();

        let roaming = self
            .roaming
            .iter()
            .filter(|key| keys.contains_key(*key))
            .cloned()
            .collect();

        Schema::from_parts(self.root.clone(), keys, groups, parents, roaming)
    }
}

fn lies_below(key: &str, group: &str) -> bool {
    key.strip_prefix(group)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == FIELD_SEPARATOR || c == BRANCH_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_of(documents: &[serde_json::Value]) -> Schema {
        discover(documents, "main")
    }

    #[test]
    fn test_groups_listed_root_first() {
        let schema = schema_of(&[json!({"e": [{"f": 1}], "a": 1, "h": [{"i": 2}]})]);
        let groups: Vec<&str> = schema.groups().collect();
        assert_eq!(groups, vec!["main", "e", "h"]);
    }

    #[test]
    fn test_columns_keep_first_seen_order() {
        let schema = schema_of(&[
            json!({"d": [1, 2], "a": 1}),
            json!({"d": [1, 2, 3], "a": 1}),
        ]);
        let columns: Vec<&str> = schema.columns("main").iter().map(|k| k.as_str()).collect();
        assert_eq!(columns, vec!["d-0", "d-1", "a", "d-2"]);
    }

    #[test]
    fn test_resolve_unknown_key() {
        let schema = schema_of(&[json!({"a": 1})]);
        assert_eq!(schema.resolve(&FieldKey::from("a")).unwrap(), "main");
        assert_eq!(
            schema.resolve(&FieldKey::from("b")),
            Err(CodecError::UnknownGroup { key: "b".to_string() })
        );
    }

    #[test]
    fn test_marker_is_not_a_column() {
        let schema = schema_of(&[
            json!({"e": [{"f": 1}]}),
            json!({"e": []}),
        ]);
        assert_eq!(schema.group_of("e-0"), Some("e"));
        assert!(schema.is_group_marker("e-0"));
        let columns: Vec<&str> = schema.columns("e").iter().map(|k| k.as_str()).collect();
        assert_eq!(columns, vec!["e.f"]);
        let selectable: Vec<&str> = schema.selectable_keys().iter().map(|k| k.as_str()).collect();
        assert_eq!(selectable, vec!["e.f"]);
    }

    #[test]
    fn test_selectable_keys_sorted() {
        let schema = schema_of(&[json!({"b": 1, "a": {"z": 1, "c": 2}})]);
        let selectable: Vec<&str> = schema.selectable_keys().iter().map(|k| k.as_str()).collect();
        assert_eq!(selectable, vec!["a.c", "a.z", "b"]);
    }

    #[test]
    fn test_restrict_keeps_ancestor_groups() {
        let schema = schema_of(&[json!({
            "a": 1,
            "c": [{"f": 5, "g": [{"h": 100, "i": 120}]}],
            "x": [{"y": 1}]
        })]);
        let selected: HashSet<FieldKey> = [FieldKey::from("c.g.i")].into_iter().collect();
        let restricted = schema.restrict(&selected);

        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted.group_of("c.g.i"), Some("c.g"));
        assert!(restricted.is_group("c"));
        assert!(restricted.is_group("c.g"));
        assert!(!restricted.is_group("x"));
        assert!(restricted.encloses("c", "c.g"));
        assert!(!restricted.encloses("main", "x"));
    }

    #[test]
    fn test_restrict_carries_group_markers() {
        let schema = schema_of(&[
            json!({"e": [{"f": 1, "g": 2}], "x": [{"y": 1}]}),
            json!({"e": [], "x": []}),
        ]);
        let selected: HashSet<FieldKey> = [FieldKey::from("e.g")].into_iter().collect();
        let restricted = schema.restrict(&selected);

        assert_eq!(restricted.group_of("e-0"), Some("e"));
        assert!(!restricted.contains_key("x-0"));
        let columns: Vec<&str> = restricted.columns("e").iter().map(|k| k.as_str()).collect();
        assert_eq!(columns, vec!["e.g"]);
    }

    #[test]
    fn test_from_tables() {
        let schema = Schema::from_tables(
            "main",
            vec![
                ("main".to_string(), vec![FieldKey::from("a")]),
                ("c".to_string(), vec![FieldKey::from("c.f")]),
                ("c.g".to_string(), vec![]),
            ],
        );
        assert_eq!(schema.group_of("a"), Some("main"));
        assert_eq!(schema.group_of("c.f"), Some("c"));
        assert!(schema.is_group("c.g"));
        assert!(!schema.is_group("main"));
        assert!(schema.encloses("main", "c"));
        assert!(schema.encloses("c", "c.g"));
        assert!(schema.encloses("main", "c.g"));
        assert!(!schema.encloses("c.g", "c"));
    }
}
