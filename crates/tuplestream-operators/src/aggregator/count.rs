//! `Count`: number of rows in each group.

use tuplestream_core::schema::Fields;
use tuplestream_core::types::{Tuple, TupleEntry, Value};

use crate::traits::{Aggregator, OpError, Operation, OutputCollector};

#[derive(Debug, Clone)]
pub struct Count {
    declared: Fields,
}

impl Count {
    /// `declared` must name exactly one field, the count.
    pub fn new(declared: Fields) -> Result<Self, OpError> {
        if declared.len() != 1 {
            return Err(OpError::Exec(format!(
                "count declares exactly one field, got {declared}"
            )));
        }
        Ok(Self { declared })
    }
}

impl Default for Count {
    fn default() -> Self {
        Self {
            declared: Fields::single("count"),
        }
    }
}

impl Operation for Count {
    fn name(&self) -> &'static str {
        "count"
    }

    fn field_declaration(&self) -> &Fields {
        &self.declared
    }
}

impl Aggregator for Count {
    type Context = i64;

    fn new_context(&self) -> i64 {
        0
    }

    fn start(&self, context: &mut i64, _group: &TupleEntry) -> Result<(), OpError> {
        *context = 0;
        Ok(())
    }

    fn aggregate(&self, context: &mut i64, _arguments: &TupleEntry) -> Result<(), OpError> {
        *context += 1;
        Ok(())
    }

    fn complete(
        &self,
        context: &mut i64,
        _group: &TupleEntry,
        output: &mut dyn OutputCollector,
    ) -> Result<(), OpError> {
        output.collect(Tuple::new(vec![Value::I64(*context)]))
    }
}
