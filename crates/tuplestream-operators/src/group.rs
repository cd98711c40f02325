//! In-memory `GroupIterator` over already-materialized rows.
//!
//! Mirrors how the shuffle substrate hands rows out: one entry buffer is
//! overwritten for every row, so callers see the same reuse rule.

use tuplestream_core::schema::Fields;
use tuplestream_core::types::{Tuple, TupleEntry};

use crate::traits::{GroupIterator, OpError};

pub struct SliceGroup<'a> {
    rows: std::slice::Iter<'a, Tuple>,
    entry: TupleEntry,
}

impl<'a> SliceGroup<'a> {
    pub fn new(fields: Fields, rows: &'a [Tuple]) -> Self {
        Self {
            rows: rows.iter(),
            entry: TupleEntry::new(fields, Tuple::default()),
        }
    }
}

impl GroupIterator for SliceGroup<'_> {
    fn next_entry(&mut self) -> Result<Option<&TupleEntry>, OpError> {
        match self.rows.next() {
            Some(row) => {
                self.entry.tuple.clear();
                self.entry.tuple.append(row);
                Ok(Some(&self.entry))
            }
            None => Ok(None),
        }
    }
}

/// Count the entries left in `entries`, consuming them.
pub fn drain_count(entries: &mut dyn GroupIterator) -> Result<usize, OpError> {
    let mut n = 0;
    while entries.next_entry()?.is_some() {
        n += 1;
    }
    Ok(n)
}
