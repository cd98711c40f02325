//! `FirstNBuffer`: emit up to N rows per group, in arrival order.

use tuplestream_core::hash::{hash_bytes, Hash256};
use tuplestream_core::schema::Fields;
use tuplestream_core::types::TupleEntry;

use crate::traits::{Buffer, GroupIterator, OpError, Operation, OutputCollector};

#[derive(Debug, Clone)]
pub struct FirstNBuffer {
    declared: Fields,
    limit: usize,
}

impl FirstNBuffer {
    pub fn new(declared: Fields, limit: usize) -> Self {
        Self { declared, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Operation for FirstNBuffer {
    fn name(&self) -> &'static str {
        "first_n"
    }

    fn field_declaration(&self) -> &Fields {
        &self.declared
    }

    fn config_hash(&self) -> Hash256 {
        hash_bytes(&(self.limit as u64).to_le_bytes())
    }
}

impl Buffer for FirstNBuffer {
    type Context = ();

    fn new_context(&self) {}

    fn operate(
        &self,
        _context: &mut (),
        _group: &TupleEntry,
        entries: &mut dyn GroupIterator,
        output: &mut dyn OutputCollector,
    ) -> Result<(), OpError> {
        let mut emitted = 0;
        // Stop pulling once the limit is reached; the rest is never decoded.
        while emitted < self.limit {
            let Some(entry) = entries.next_entry()? else {
                break;
            };
            output.collect(entry.tuple.clone())?;
            emitted += 1;
        }
        Ok(())
    }
}
