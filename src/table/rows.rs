use crate::key::RecordIndex;

/// Maps Record Indices to row numbers for one table.
///
/// Consecutive cells sharing an index share a row; any change of index opens
/// the next row. Cells of one index must therefore arrive contiguously: an
/// index that comes back after another one gets a fresh row.
#[derive(Debug, Clone)]
pub struct RowAssigner {
    current_row: usize,
    last_seen: Option<RecordIndex>,
}

impl RowAssigner {
    /// `base` is the header row; the first index maps to `base + 1`.
    pub fn new(base: usize) -> Self {
        RowAssigner {
            current_row: base,
            last_seen: None,
        }
    }

    pub fn row_for(&mut self, index: &RecordIndex) -> usize {
        if self.last_seen.as_ref() != Some(index) {
            self.current_row += 1;
            self.last_seen = Some(index.clone());
        }
        self.current_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_index_coalesces() {
        let mut rows = RowAssigner::new(0);
        let assigned: Vec<usize> = ["1", "1", "2", "2", "2"]
            .into_iter()
            .map(|i| rows.row_for(&RecordIndex::from(i)))
            .collect();
        assert_eq!(assigned, vec![1, 1, 2, 2, 2]);
    }

    #[test]
    fn test_base_offsets_rows() {
        let mut rows = RowAssigner::new(4);
        assert_eq!(rows.row_for(&RecordIndex::from("1-0")), 5);
        assert_eq!(rows.row_for(&RecordIndex::from("1-1")), 6);
    }

    #[test]
    fn test_returning_index_opens_new_row() {
        let mut rows = RowAssigner::new(0);
        rows.row_for(&RecordIndex::from("1"));
        rows.row_for(&RecordIndex::from("2"));
        assert_eq!(rows.row_for(&RecordIndex::from("1")), 3);
    }
}
