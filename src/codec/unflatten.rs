//! Cells to tree
//!
//! Rebuilds one record from its cells. Field Keys do not say which of their
//! prefixes were arrays of objects, so the [`Schema`] groups are consulted.
//! Every prefix naming a group may consume a Record Index position; the
//! ones that do form a chain of groups, each found directly inside the one
//! before it, as long as the index has positions. A path can be an Object in
//! one place and an array of objects in another, so several chains may fit.
//! Chains ending at the key's own group win when the key was only ever seen
//! in that group. A cell that still fits more than one chain, or none, is a
//! structural mismatch.
//!
//! Containers are only ever appended to. Missing array-of-objects elements
//! are padded with empty Objects, missing inner arrays with empty Arrays, and
//! the last position of a scalar key is appended as-is. [`Unflattener::unflatten`]
//! therefore first puts the cells in document order: array positions
//! ascending, fields in the order they first arrive.

use crate::error::{CodecError, Result};
use crate::key::{join_field, join_position, split_branch, FieldKey};
use crate::schema::Schema;
use crate::types::{Cell, CellValue};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Position consumed by each parent segment of a key, if any
type Slots = Vec<Option<usize>>;

/// Rebuilds records from cells using the groups of a schema
pub struct Unflattener<'s> {
    schema: &'s Schema,
}

impl<'s> Unflattener<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Unflattener { schema }
    }

    /// Rebuild one record. All cells must share the same record ordinal;
    /// they may arrive in any order.
    pub fn unflatten<I>(&self, cells: I) -> Result<Value>
    where
        I: IntoIterator<Item = Cell>,
    {
        let mut ranks = HashMap::new();
        let mut located = Vec::new();
        for cell in cells {
            let slots = self.locate(&cell)?;
            let order = document_order(&cell.key, &slots, &mut ranks)?;
            located.push((order, slots, cell));
        }
        // Stable, so cells of the same position keep their arrival order
        located.sort_by(|(a, ..), (b, ..)| a.cmp(b));

        let mut record = Map::new();
        for (_, slots, cell) in located {
            place(&mut record, cell, &slots)?;
        }
        Ok(Value::Object(record))
    }

    /// Place a single cell into a partially rebuilt record. Cells of one
    /// array must be inserted in increasing position order.
    pub fn insert(&self, record: &mut Map<String, Value>, cell: Cell) -> Result<()> {
        let slots = self.locate(&cell)?;
        place(record, cell, &slots)
    }

    fn locate(&self, cell: &Cell) -> Result<Slots> {
        let key = cell.key.as_str();
        let segments = cell.key.segments();
        let Some((_, parents)) = segments.split_last() else {
            return Err(CodecError::mismatch(key, "", "a non-empty field key"));
        };

        let positions = cell.index.positions()?;
        // The leading ordinal identifies the record, not a position in it
        let remainder = positions.get(1..).unwrap_or_default();
        self.lineage(key, parents, remainder)
    }

    fn lineage(&self, key: &str, parents: &[&str], positions: &[usize]) -> Result<Slots> {
        let mut candidates = Vec::new();
        let mut path = String::new();
        for (depth, segment) in parents.iter().enumerate() {
            path = join_field(&path, segment);
            if self.schema.is_group(&path) {
                candidates.push((depth, path.clone()));
            }
        }

        let home = self
            .schema
            .home_of(key)
            .filter(|group| candidates.iter().any(|(_, candidate)| candidate == group));
        let mut search = ChainSearch {
            schema: self.schema,
            candidates: &candidates,
            end: home,
            found: Vec::new(),
        };
        if home.is_some() {
            search.run(positions.len());
        }
        if search.found.is_empty() {
            search.end = None;
            search.run(positions.len());
        }

        let chain = match search.found.as_slice() {
            [chain] => chain,
            [] => return Err(CodecError::mismatch(key, &path, "an array of objects")),
            _ => {
                return Err(CodecError::mismatch(
                    key,
                    &path,
                    "a single array-of-objects path",
                ))
            }
        };

        let mut slots = vec![None; parents.len()];
        for (&candidate, &position) in chain.iter().zip(positions) {
            let Some((depth, _)) = candidates.get(candidate) else {
                continue;
            };
            if let Some(slot) = slots.get_mut(*depth) {
                *slot = Some(position);
            }
        }
        Ok(slots)
    }
}

/// Rebuild one record from its cells.
pub fn unflatten<I>(cells: I, schema: &Schema) -> Result<Value>
where
    I: IntoIterator<Item = Cell>,
{
    Unflattener::new(schema).unflatten(cells)
}

/// Enumerates chains of candidate groups linked by [`Schema::encloses`].
struct ChainSearch<'c> {
    schema: &'c Schema,
    candidates: &'c [(usize, String)],
    end: Option<&'c str>,
    found: Vec<Vec<usize>>,
}

impl ChainSearch<'_> {
    fn run(&mut self, length: usize) {
        self.found.clear();
        let schema = self.schema;
        self.extend(schema.root(), 0, length, &mut Vec::new());
    }

    // Two chains are enough to know the choice is ambiguous
    fn extend(&mut self, from: &str, start: usize, remaining: usize, chain: &mut Vec<usize>) {
        let candidates = self.candidates;
        if remaining == 0 {
            let last = chain
                .last()
                .and_then(|&c| candidates.get(c))
                .map(|(_, group)| group.as_str());
            if self.end.is_none() || last == self.end {
                self.found.push(chain.clone());
            }
            return;
        }
        for (next, (_, group)) in candidates.iter().enumerate().skip(start) {
            if self.found.len() > 1 {
                return;
            }
            if self.schema.encloses(from, group) {
                chain.push(next);
                self.extend(group, next + 1, remaining - 1, chain);
                chain.pop();
            }
        }
    }
}

/// Sort key for document order: one `(field rank, array positions)` step per
/// key segment. Ranks count distinct paths in arrival order.
fn document_order(
    key: &FieldKey,
    slots: &[Option<usize>],
    ranks: &mut HashMap<String, usize>,
) -> Result<Vec<(usize, Vec<usize>)>> {
    let mut order = Vec::new();
    let mut trail = String::new();
    for (depth, segment) in key.segments().into_iter().enumerate() {
        let (name, mut positions) = split_branch(key.as_str(), segment)?;
        if let Some(Some(position)) = slots.get(depth) {
            positions.push(*position);
        }

        trail = join_field(&trail, name);
        let next = ranks.len();
        let rank = *ranks.entry(trail.clone()).or_insert(next);
        for &position in &positions {
            trail = join_position(&trail, position);
        }
        order.push((rank, positions));
    }
    Ok(order)
}

fn place(record: &mut Map<String, Value>, cell: Cell, slots: &[Option<usize>]) -> Result<()> {
    let key = cell.key.as_str();
    let segments = cell.key.segments();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(CodecError::mismatch(key, "", "a non-empty field key"));
    };

    let mut path = String::new();
    let mut current = record;
    for (segment, slot) in parents.iter().zip(slots) {
        path = join_field(&path, segment);
        current = match *slot {
            Some(position) => {
                let items = array_slot(current, key, segment)?;
                object_element(items, position, key, &path)?
            }
            None => object_slot(current, key, segment, &path)?,
        };
    }

    place_leaf(current, key, leaf, cell.value)
}

/// Resolve `name` or `name-p1-…-pn` to the array it addresses, creating
/// every level on the way.
fn array_slot<'m>(
    map: &'m mut Map<String, Value>,
    key: &str,
    segment: &str,
) -> Result<&'m mut Vec<Value>> {
    let (name, positions) = split_branch(key, segment)?;
    let slot = map
        .entry(name)
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(items) = slot else {
        return Err(CodecError::mismatch(key, name, "an array"));
    };
    let mut items = items;
    for position in positions {
        items = inner_array(items, position, key, segment)?;
    }
    Ok(items)
}

fn inner_array<'v>(
    items: &'v mut Vec<Value>,
    position: usize,
    key: &str,
    segment: &str,
) -> Result<&'v mut Vec<Value>> {
    while items.len() <= position {
        items.push(Value::Array(Vec::new()));
    }
    match &mut items[position] {
        Value::Array(inner) => Ok(inner),
        _ => Err(CodecError::mismatch(key, segment, "an array")),
    }
}

fn object_element<'v>(
    items: &'v mut Vec<Value>,
    position: usize,
    key: &str,
    path: &str,
) -> Result<&'v mut Map<String, Value>> {
    while items.len() <= position {
        items.push(Value::Object(Map::new()));
    }
    match &mut items[position] {
        Value::Object(obj) => Ok(obj),
        _ => Err(CodecError::mismatch(key, path, "an object element")),
    }
}

fn object_slot<'m>(
    map: &'m mut Map<String, Value>,
    key: &str,
    segment: &str,
    path: &str,
) -> Result<&'m mut Map<String, Value>> {
    match map
        .entry(segment)
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(obj) => Ok(obj),
        _ => Err(CodecError::mismatch(key, path, "an object")),
    }
}

fn place_leaf(
    map: &mut Map<String, Value>,
    key: &str,
    leaf: &str,
    value: CellValue,
) -> Result<()> {
    let (name, positions) = split_branch(key, leaf)?;
    let Some((_, outer)) = positions.split_last() else {
        let value = match value {
            CellValue::Scalar(v) => v,
            CellValue::EmptyList => Value::Array(Vec::new()),
        };
        map.insert(name.to_string(), value);
        return Ok(());
    };

    let slot = map
        .entry(name)
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(items) = slot else {
        return Err(CodecError::mismatch(key, name, "an array"));
    };
    let mut items = items;
    for &position in outer {
        items = inner_array(items, position, key, leaf)?;
    }
    if let CellValue::Scalar(v) = value {
        items.push(v);
    }
    Ok(())
}
