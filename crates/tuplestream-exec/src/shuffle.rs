//! Local shuffle: multiplex, partition and sort.
//!
//! Every row of every input becomes one record:
//! - key: `IndexTuple(stream index, grouping values)` via `IndexedTupleCodec`
//! - value: the full row via `TupleCodec`
//!
//! Records are hash-partitioned on the grouping values alone, so rows from
//! different streams sharing a key meet in the same partition. Each partition
//! is then sorted with the grouping comparator over the serialized keys.

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use tuplestream_codec::{IndexedTupleCodec, TupleCodec, TypeCodecRegistry};
use tuplestream_core::config::EngineConfig;
use tuplestream_core::hash::partition_hash;
use tuplestream_core::id::{PartitionId, StreamIndex};
use tuplestream_core::schema::Fields;
use tuplestream_core::types::{IndexTuple, Tuple};
use tuplestream_operators::{GroupingComparator, OpError};

use crate::error::{ExecError, Result};
use crate::metrics::emit_span;
use crate::pool::run_parallel;

/// One logical input. Its stream index is its position in the input slice.
#[derive(Debug, Clone)]
pub struct ShuffleInput {
    pub fields: Fields,
    pub group_fields: Fields,
    pub rows: Vec<Tuple>,
}

impl ShuffleInput {
    pub fn new(fields: Fields, group_fields: Fields, rows: Vec<Tuple>) -> Self {
        Self {
            fields,
            group_fields,
            rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A sorted run of records sharing a partition.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    id: PartitionId,
    records: Vec<Record>,
}

impl Partition {
    pub fn id(&self) -> PartitionId {
        self.id
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximal runs of records whose keys belong to the same group.
    pub fn groups(&self, comparator: &GroupingComparator) -> Result<Vec<Range<usize>>> {
        let mut groups = Vec::new();
        let mut start = 0;
        for i in 1..self.records.len() {
            if !comparator.same_group_serialized(&self.records[start].key, &self.records[i].key)? {
                groups.push(start..i);
                start = i;
            }
        }
        if !self.records.is_empty() {
            groups.push(start..self.records.len());
        }
        Ok(groups)
    }
}

pub struct Shuffle {
    config: EngineConfig,
    values: TupleCodec,
    comparator: GroupingComparator,
}

impl Shuffle {
    pub fn new(registry: Arc<TypeCodecRegistry>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let values = TupleCodec::with_limits(registry, config.codec_limits());
        let comparator = GroupingComparator::new(IndexedTupleCodec::new(values.clone()));
        Ok(Self {
            config,
            values,
            comparator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn value_codec(&self) -> &TupleCodec {
        &self.values
    }

    pub fn key_codec(&self) -> &IndexedTupleCodec {
        self.comparator.codec()
    }

    pub fn comparator(&self) -> &GroupingComparator {
        &self.comparator
    }

    /// Encode, partition and sort every row of `inputs`.
    ///
    /// Returns `num_partitions` partitions in id order; some may be empty.
    pub fn multiplex(&self, inputs: &[ShuffleInput]) -> Result<Vec<Partition>> {
        let width = check_inputs(inputs)?;
        let n = self.config.num_partitions as u64;

        let mut buckets: Vec<Partition> = (0..n)
            .map(|id| Partition {
                id: PartitionId::new(id),
                records: Vec::new(),
            })
            .collect();

        let mut total = 0usize;
        for (stream, input) in inputs.iter().enumerate() {
            let index = StreamIndex::new(u32::try_from(stream).map_err(|_| {
                ExecError::Invalid(format!("too many inputs: {}", inputs.len()))
            })?);
            let positions = input.fields.positions_of(&input.group_fields)?;
            debug_assert_eq!(positions.len(), width);

            for (row_no, row) in input.rows.iter().enumerate() {
                if row.len() != input.fields.len() {
                    return Err(ExecError::Invalid(format!(
                        "stream {index} row {row_no} has {} values, fields {} declare {}",
                        row.len(),
                        input.fields,
                        input.fields.len()
                    )));
                }
                let key = IndexTuple::new(index, row.select(&positions)?);
                let slot = partition_hash(&key.tuple).prefix_u64() % n;
                buckets[slot as usize].records.push(Record {
                    key: self.key_codec().encode_to_vec(&key)?,
                    value: self.values.encode_to_vec(row)?,
                });
                total += 1;
            }
        }

        let sorted = run_parallel(self.config.max_parallel_tasks, buckets, |mut part| {
            let records = std::mem::take(&mut part.records);
            part.records = try_sort_by(records, &mut |a: &Record, b: &Record| {
                self.comparator.compare_serialized(&a.key, &b.key)
            })?;
            Ok(part)
        })?;

        #[cfg(feature = "tracing")]
        tracing::debug!(records = total, partitions = n, "shuffle multiplexed");
        emit_span(
            "shuffle",
            &[
                ("records", total.to_string()),
                ("partitions", n.to_string()),
            ],
        );
        Ok(sorted)
    }
}

/// Validates the inputs and returns the shared grouping width.
fn check_inputs(inputs: &[ShuffleInput]) -> Result<usize> {
    let first = inputs
        .first()
        .ok_or_else(|| ExecError::Invalid("at least one input is required".into()))?;
    let width = first.group_fields.len();
    for (stream, input) in inputs.iter().enumerate() {
        if input.group_fields.len() != width {
            return Err(ExecError::Invalid(format!(
                "stream {stream} groups on {} but stream 0 groups on {}",
                input.group_fields, first.group_fields
            )));
        }
    }
    Ok(width)
}

/// Stable merge sort with a fallible comparator. The first error aborts.
fn try_sort_by<T, F>(mut items: Vec<T>, cmp: &mut F) -> std::result::Result<Vec<T>, OpError>
where
    F: FnMut(&T, &T) -> std::result::Result<Ordering, OpError>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = try_sort_by(items, cmp)?;
    let right = try_sort_by(right, cmp)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        // Ties keep the left element first.
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(l, r)? == Ordering::Greater,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        out.extend(if take_right { right.next() } else { left.next() });
    }
    Ok(out)
}
