//! `GroupBy`: run an `Aggregator` or a `Buffer` over every group.
//!
//! Inputs are merged (they must share one field layout). Each partition is
//! reduced independently with its own operation context; when
//! `max_parallel_tasks > 1` partitions run on scoped worker threads.
//!
//! Every emitted result is prefixed with the group key, so output rows are
//! laid out as `group fields ++ declared fields`.

use tuplestream_codec::TupleCodec;
use tuplestream_core::schema::Fields;
use tuplestream_core::types::{IndexTuple, Tuple, TupleEntry};
use tuplestream_operators::{Aggregator, Buffer, GroupIterator, OpError, OutputCollector};

use crate::error::{ExecError, Result};
use crate::metrics::emit_span;
use crate::pool::run_parallel;
use crate::shuffle::{Partition, Record, Shuffle, ShuffleInput};

/// Rows emitted by a grouped run, in partition order then key order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutput {
    pub fields: Fields,
    pub tuples: Vec<Tuple>,
    pub groups: usize,
}

impl GroupOutput {
    fn concat(fields: Fields, parts: Vec<(Vec<Tuple>, usize)>) -> Self {
        let mut tuples = Vec::new();
        let mut groups = 0;
        for (rows, n) in parts {
            tuples.extend(rows);
            groups += n;
        }
        Self {
            fields,
            tuples,
            groups,
        }
    }
}

pub struct GroupBy<'a> {
    shuffle: &'a Shuffle,
    arguments: Option<Fields>,
}

impl<'a> GroupBy<'a> {
    pub fn new(shuffle: &'a Shuffle) -> Self {
        Self {
            shuffle,
            arguments: None,
        }
    }

    /// Hand operations only these fields of each row instead of the whole row.
    pub fn with_arguments(mut self, arguments: Fields) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn every_aggregator<A: Aggregator>(
        &self,
        inputs: &[ShuffleInput],
        op: &A,
    ) -> Result<GroupOutput> {
        let layout = self.layout(inputs, op.field_declaration())?;
        let parts = self.shuffle.multiplex(inputs)?;
        let reduced = run_parallel(
            self.shuffle.config().max_parallel_tasks,
            parts.iter().collect::<Vec<_>>(),
            |part| self.reduce_aggregator(part, &layout, op),
        )?;
        let out = GroupOutput::concat(layout.output, reduced);
        emit_span(
            "every_aggregator",
            &[
                ("operation", op.name().to_string()),
                ("groups", out.groups.to_string()),
                ("rows", out.tuples.len().to_string()),
            ],
        );
        Ok(out)
    }

    pub fn every_buffer<B: Buffer>(&self, inputs: &[ShuffleInput], op: &B) -> Result<GroupOutput> {
        let layout = self.layout(inputs, op.field_declaration())?;
        let parts = self.shuffle.multiplex(inputs)?;
        let reduced = run_parallel(
            self.shuffle.config().max_parallel_tasks,
            parts.iter().collect::<Vec<_>>(),
            |part| self.reduce_buffer(part, &layout, op),
        )?;
        let out = GroupOutput::concat(layout.output, reduced);
        emit_span(
            "every_buffer",
            &[
                ("operation", op.name().to_string()),
                ("groups", out.groups.to_string()),
                ("rows", out.tuples.len().to_string()),
            ],
        );
        Ok(out)
    }

    fn layout(&self, inputs: &[ShuffleInput], declared: &Fields) -> Result<Layout> {
        let first = inputs
            .first()
            .ok_or_else(|| ExecError::Invalid("at least one input is required".into()))?;
        if let Some(other) = inputs.iter().find(|i| i.fields != first.fields) {
            return Err(ExecError::Invalid(format!(
                "merged inputs must share fields: {} vs {}",
                first.fields, other.fields
            )));
        }
        if let Some(other) = inputs.iter().find(|i| i.group_fields != first.group_fields) {
            return Err(ExecError::Invalid(format!(
                "merged inputs must group on the same fields: {} vs {}",
                first.group_fields, other.group_fields
            )));
        }
        let projection = match &self.arguments {
            None => Projection::all(first.fields.clone()),
            Some(args) => Projection::select(&first.fields, args.clone())?,
        };
        Ok(Layout {
            group_fields: first.group_fields.clone(),
            output: first.group_fields.append(declared)?,
            width: declared.len(),
            projection,
        })
    }

    fn reduce_aggregator<A: Aggregator>(
        &self,
        part: &Partition,
        layout: &Layout,
        op: &A,
    ) -> Result<(Vec<Tuple>, usize)> {
        let mut context = op.new_context();
        let mut key = IndexTuple::default();
        let mut group = TupleEntry::new(layout.group_fields.clone(), Tuple::default());
        let mut row = Tuple::default();
        let mut arguments = TupleEntry::new(layout.projection.fields.clone(), Tuple::default());
        let mut out = Vec::new();

        let groups = part.groups(self.shuffle.comparator())?;
        for range in &groups {
            let records = &part.records()[range.clone()];
            self.load_key(&records[0], &mut key, &mut group)?;

            op.start(&mut context, &group)?;
            for record in records {
                self.shuffle
                    .value_codec()
                    .decode_slice_into(&record.value, &mut row)?;
                layout.projection.fill(&row, &mut arguments.tuple)?;
                op.aggregate(&mut context, &arguments)?;
            }
            // An aggregator yields at most one result per group.
            let mut collector =
                KeyedCollector::new(op.name(), &group.tuple, layout.width, &mut out).at_most(1);
            op.complete(&mut context, &group, &mut collector)?;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(partition = %part.id(), groups = groups.len(), "aggregated partition");
        Ok((out, groups.len()))
    }

    fn reduce_buffer<B: Buffer>(
        &self,
        part: &Partition,
        layout: &Layout,
        op: &B,
    ) -> Result<(Vec<Tuple>, usize)> {
        let mut context = op.new_context();
        let mut key = IndexTuple::default();
        let mut group = TupleEntry::new(layout.group_fields.clone(), Tuple::default());
        let mut entries = EncodedGroup::new(self.shuffle.value_codec(), &layout.projection);
        let mut out = Vec::new();

        let groups = part.groups(self.shuffle.comparator())?;
        for range in &groups {
            let records = &part.records()[range.clone()];
            self.load_key(&records[0], &mut key, &mut group)?;
            entries.reset(records);
            let mut collector = KeyedCollector::new(op.name(), &group.tuple, layout.width, &mut out);
            op.operate(&mut context, &group, &mut entries, &mut collector)?;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(partition = %part.id(), groups = groups.len(), "buffered partition");
        Ok((out, groups.len()))
    }

    /// Decode a group's key once into the reused group entry.
    fn load_key(&self, record: &Record, key: &mut IndexTuple, group: &mut TupleEntry) -> Result<()> {
        self.shuffle.key_codec().decode_slice_into(&record.key, key)?;
        group.tuple.clear();
        group.tuple.append(&key.tuple);
        Ok(())
    }
}

struct Layout {
    group_fields: Fields,
    output: Fields,
    width: usize,
    projection: Projection,
}

/// Maps a decoded row to the argument tuple an operation sees.
pub(crate) struct Projection {
    pub(crate) fields: Fields,
    positions: Option<Vec<usize>>,
}

impl Projection {
    pub(crate) fn all(fields: Fields) -> Self {
        Self {
            fields,
            positions: None,
        }
    }

    fn select(from: &Fields, selector: Fields) -> Result<Self> {
        let positions = from.positions_of(&selector)?;
        Ok(Self {
            fields: selector,
            positions: Some(positions),
        })
    }

    pub(crate) fn fill(&self, row: &Tuple, out: &mut Tuple) -> std::result::Result<(), OpError> {
        out.clear();
        match &self.positions {
            None => out.append(row),
            Some(positions) => {
                for &pos in positions {
                    let value = row.get(pos).ok_or_else(|| {
                        OpError::Exec(format!("row of arity {} has no position {pos}", row.len()))
                    })?;
                    out.push(value.clone());
                }
            }
        }
        Ok(())
    }
}

/// Lazily decodes the values of one group into a single reused entry.
struct EncodedGroup<'a> {
    codec: &'a TupleCodec,
    projection: &'a Projection,
    records: &'a [Record],
    row: Tuple,
    entry: TupleEntry,
}

impl<'a> EncodedGroup<'a> {
    fn new(codec: &'a TupleCodec, projection: &'a Projection) -> Self {
        Self {
            codec,
            projection,
            records: &[],
            row: Tuple::default(),
            entry: TupleEntry::new(projection.fields.clone(), Tuple::default()),
        }
    }

    fn reset(&mut self, records: &'a [Record]) {
        self.records = records;
    }
}

impl GroupIterator for EncodedGroup<'_> {
    fn next_entry(&mut self) -> std::result::Result<Option<&TupleEntry>, OpError> {
        let Some((record, rest)) = self.records.split_first() else {
            return Ok(None);
        };
        self.records = rest;
        self.codec.decode_slice_into(&record.value, &mut self.row)?;
        self.projection.fill(&self.row, &mut self.entry.tuple)?;
        Ok(Some(&self.entry))
    }
}

/// Prefixes each result with the group key and checks its arity and, when
/// a budget is set, how many results one group may emit.
pub(crate) struct KeyedCollector<'a> {
    operation: &'static str,
    key: &'a Tuple,
    width: usize,
    budget: Option<usize>,
    emitted: usize,
    out: &'a mut Vec<Tuple>,
}

impl<'a> KeyedCollector<'a> {
    pub(crate) fn new(
        operation: &'static str,
        key: &'a Tuple,
        width: usize,
        out: &'a mut Vec<Tuple>,
    ) -> Self {
        Self {
            operation,
            key,
            width,
            budget: None,
            emitted: 0,
            out,
        }
    }

    pub(crate) fn at_most(mut self, results: usize) -> Self {
        self.budget = Some(results);
        self
    }
}

impl OutputCollector for KeyedCollector<'_> {
    fn collect(&mut self, result: Tuple) -> std::result::Result<(), OpError> {
        if result.len() != self.width {
            return Err(OpError::Exec(format!(
                "{} emitted {} values but declares {} fields",
                self.operation,
                result.len(),
                self.width
            )));
        }
        if let Some(budget) = self.budget {
            if self.emitted >= budget {
                return Err(OpError::Exec(format!(
                    "{} emitted more than {budget} result(s) for group {}",
                    self.operation, self.key
                )));
            }
        }
        let mut row = Tuple::with_capacity(self.key.len() + result.len());
        row.append(self.key);
        row.append(&result);
        self.out.push(row);
        self.emitted += 1;
        Ok(())
    }
}
