//! Tree to cells
//!
//! Walks a document depth-first in insertion order and yields one [`Cell`]
//! per leaf. The walk is lazy: cells are produced on demand from an explicit
//! stack, so a consumer can stop early.

use crate::key::{FieldKey, RecordIndex};
use crate::types::{Cell, CellValue};
use serde_json::Value;
use std::collections::HashSet;

/// Lazy cell sequence for one document
pub struct Cells<'a> {
    stack: Vec<Pending<'a>>,
}

struct Pending<'a> {
    value: &'a Value,
    key: FieldKey,
    index: RecordIndex,
}

/// Flatten `value` with every cell rooted at `index`.
pub fn flatten(value: &Value, index: RecordIndex) -> Cells<'_> {
    flatten_under(value, index, FieldKey::default())
}

/// Flatten `value` as if it sat at `key_prefix` in a larger document.
pub fn flatten_under(value: &Value, index: RecordIndex, key_prefix: FieldKey) -> Cells<'_> {
    Cells {
        stack: vec![Pending {
            value,
            key: key_prefix,
            index,
        }],
    }
}

/// Flatten `value`, keeping only cells whose key is in `selected`.
pub fn flatten_selected<'a>(
    value: &'a Value,
    index: RecordIndex,
    selected: &'a HashSet<FieldKey>,
) -> impl Iterator<Item = Cell> + 'a {
    flatten(value, index).filter(move |cell| selected.contains(&cell.key))
}

impl<'a> Cells<'a> {
    fn push(&mut self, value: &'a Value, key: FieldKey, index: RecordIndex) {
        self.stack.push(Pending { value, key, index });
    }
}

impl Iterator for Cells<'_> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        while let Some(Pending { value, key, index }) = self.stack.pop() {
            match value {
                Value::Object(obj) => {
                    // Reversed so the stack pops fields in insertion order
                    for (name, child) in obj.iter().rev() {
                        self.push(child, key.child(name), index.clone());
                    }
                }
                Value::Array(arr) if arr.is_empty() => {
                    return Some(Cell::new(key.empty_marker(), index, CellValue::EmptyList));
                }
                Value::Array(arr) => {
                    for (position, element) in arr.iter().enumerate().rev() {
                        if element.is_object() {
                            // The array folds into its parent key; the position goes to the index
                            self.push(element, key.clone(), index.branch(position));
                        } else {
                            self.push(element, key.position(position), index.clone());
                        }
                    }
                }
                scalar => {
                    return Some(Cell::new(key, index, CellValue::Scalar(scalar.clone())));
                }
            }
        }
        None
    }
}
