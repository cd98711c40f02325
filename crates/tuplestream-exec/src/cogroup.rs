//! `CoGroup`: join several streams on their grouping key and hand the joined
//! rows of each key to a `Buffer`.
//!
//! Within a group the comparator orders records by stream index, so one pass
//! demultiplexes them into per-stream sides. The joined rows are the cross
//! product of the sides in stream order; a side the joiner treats as outer is
//! padded with a single all-null row when the key is missing from it.
//!
//! `operate` runs once for every key, even when the join yields no rows.

use tuplestream_core::schema::Fields;
use tuplestream_core::types::{IndexTuple, Tuple, TupleEntry};
use tuplestream_operators::{Buffer, GroupIterator, OpError};

use crate::error::{ExecError, Result};
use crate::group_by::{GroupOutput, KeyedCollector};
use crate::metrics::emit_span;
use crate::pool::run_parallel;
use crate::shuffle::{Partition, Shuffle, ShuffleInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    /// Rows only for keys present in every stream.
    Inner,
    /// Every key; missing streams are null-padded.
    Outer,
    /// Every key of the first of two streams.
    Left,
    /// Every key of the second of two streams.
    Right,
}

impl Joiner {
    fn pads(self, stream: usize) -> bool {
        match self {
            Joiner::Inner => false,
            Joiner::Outer => true,
            Joiner::Left => stream == 1,
            Joiner::Right => stream == 0,
        }
    }
}

pub struct CoGroup<'a> {
    shuffle: &'a Shuffle,
    joiner: Joiner,
}

impl<'a> CoGroup<'a> {
    pub fn new(shuffle: &'a Shuffle, joiner: Joiner) -> Self {
        Self { shuffle, joiner }
    }

    pub fn joiner(&self) -> Joiner {
        self.joiner
    }

    /// Joined rows carry the fields of every input in stream order.
    pub fn joined_fields(&self, inputs: &[ShuffleInput]) -> Result<Fields> {
        let mut fields = Fields::empty();
        for input in inputs {
            fields = fields.append(&input.fields)?;
        }
        Ok(fields)
    }

    pub fn every_buffer<B: Buffer>(&self, inputs: &[ShuffleInput], op: &B) -> Result<GroupOutput> {
        if matches!(self.joiner, Joiner::Left | Joiner::Right) && inputs.len() != 2 {
            return Err(ExecError::Invalid(format!(
                "{:?} join needs exactly two inputs, got {}",
                self.joiner,
                inputs.len()
            )));
        }
        let first = inputs
            .first()
            .ok_or_else(|| ExecError::Invalid("at least one input is required".into()))?;
        let layout = JoinLayout {
            group_fields: first.group_fields.clone(),
            joined: self.joined_fields(inputs)?,
            arities: inputs.iter().map(|i| i.fields.len()).collect(),
            width: op.field_declaration().len(),
        };
        let output = first.group_fields.append(op.field_declaration())?;

        let parts = self.shuffle.multiplex(inputs)?;
        let reduced = run_parallel(
            self.shuffle.config().max_parallel_tasks,
            parts.iter().collect::<Vec<_>>(),
            |part| self.reduce(part, &layout, op),
        )?;

        let mut tuples = Vec::new();
        let mut groups = 0;
        for (rows, n) in reduced {
            tuples.extend(rows);
            groups += n;
        }
        emit_span(
            "cogroup",
            &[
                ("operation", op.name().to_string()),
                ("joiner", format!("{:?}", self.joiner)),
                ("groups", groups.to_string()),
            ],
        );
        Ok(GroupOutput {
            fields: output,
            tuples,
            groups,
        })
    }

    fn reduce<B: Buffer>(
        &self,
        part: &Partition,
        layout: &JoinLayout,
        op: &B,
    ) -> Result<(Vec<Tuple>, usize)> {
        let mut context = op.new_context();
        let mut key = IndexTuple::default();
        let mut group = TupleEntry::new(layout.group_fields.clone(), Tuple::default());
        let mut sides: Vec<Vec<Tuple>> = layout.arities.iter().map(|_| Vec::new()).collect();
        let mut out = Vec::new();

        let groups = part.groups(self.shuffle.comparator())?;
        for range in &groups {
            for side in sides.iter_mut() {
                side.clear();
            }
            for (i, record) in part.records()[range.clone()].iter().enumerate() {
                self.shuffle.key_codec().decode_slice_into(&record.key, &mut key)?;
                if i == 0 {
                    group.tuple.clear();
                    group.tuple.append(&key.tuple);
                }
                let stream = key.index.get() as usize;
                let side = sides.get_mut(stream).ok_or_else(|| {
                    ExecError::Invalid(format!("record from unknown stream {}", key.index))
                })?;
                side.push(self.shuffle.value_codec().decode_slice(&record.value)?);
            }
            for (stream, side) in sides.iter_mut().enumerate() {
                if side.is_empty() && self.joiner.pads(stream) {
                    side.push(Tuple::nulls(layout.arities[stream]));
                }
            }

            let mut joined = JoinIterator::new(layout.joined.clone(), &sides);
            let mut collector = KeyedCollector::new(op.name(), &group.tuple, layout.width, &mut out);
            op.operate(&mut context, &group, &mut joined, &mut collector)?;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(partition = %part.id(), groups = groups.len(), joiner = ?self.joiner, "cogrouped partition");
        Ok((out, groups.len()))
    }
}

struct JoinLayout {
    group_fields: Fields,
    joined: Fields,
    arities: Vec<usize>,
    width: usize,
}

/// Lazy cross product over the per-stream sides of one key.
pub struct JoinIterator<'a> {
    sides: &'a [Vec<Tuple>],
    cursor: Vec<usize>,
    done: bool,
    entry: TupleEntry,
}

impl<'a> JoinIterator<'a> {
    pub fn new(fields: Fields, sides: &'a [Vec<Tuple>]) -> Self {
        Self {
            sides,
            cursor: vec![0; sides.len()],
            done: sides.is_empty() || sides.iter().any(Vec::is_empty),
            entry: TupleEntry::new(fields, Tuple::default()),
        }
    }

    // Odometer step, last stream fastest.
    fn advance(&mut self) {
        for stream in (0..self.sides.len()).rev() {
            self.cursor[stream] += 1;
            if self.cursor[stream] < self.sides[stream].len() {
                return;
            }
            self.cursor[stream] = 0;
        }
        self.done = true;
    }
}

impl GroupIterator for JoinIterator<'_> {
    fn next_entry(&mut self) -> std::result::Result<Option<&TupleEntry>, OpError> {
        if self.done {
            return Ok(None);
        }
        self.entry.tuple.clear();
        for (side, &at) in self.sides.iter().zip(&self.cursor) {
            self.entry.tuple.append(&side[at]);
        }
        self.advance();
        Ok(Some(&self.entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuplestream_codec::TypeCodecRegistry;
    use tuplestream_core::config::EngineConfig;
    use tuplestream_core::tuple;
    use tuplestream_core::types::Value;
    use tuplestream_operators::group::drain_count;
    use tuplestream_operators::{FirstNBuffer, Operation, OutputCollector};

    fn shuffle() -> Shuffle {
        Shuffle::new(
            TypeCodecRegistry::with_builtins().into_shared(),
            EngineConfig::default(),
        )
        .unwrap()
    }

    fn people() -> ShuffleInput {
        ShuffleInput::new(
            Fields::new(["id", "name"]).unwrap(),
            Fields::new(["id"]).unwrap(),
            vec![tuple![1i32, "ann"], tuple![2i32, "bob"], tuple![3i32, "cy"]],
        )
    }

    fn orders() -> ShuffleInput {
        ShuffleInput::new(
            Fields::new(["owner", "item"]).unwrap(),
            Fields::new(["owner"]).unwrap(),
            vec![
                tuple![1i32, "tea"],
                tuple![3i32, "jam"],
                tuple![1i32, "pen"],
                tuple![4i32, "ink"],
            ],
        )
    }

    fn all_rows() -> FirstNBuffer {
        let fields = Fields::new(["p_id", "p_name", "o_owner", "o_item"]).unwrap();
        FirstNBuffer::new(fields, usize::MAX)
    }

    /// Counts joined rows; emits the count even when it is zero.
    struct JoinSize {
        declared: Fields,
    }

    impl Operation for JoinSize {
        fn name(&self) -> &'static str {
            "join_size"
        }

        fn field_declaration(&self) -> &Fields {
            &self.declared
        }
    }

    impl Buffer for JoinSize {
        type Context = ();

        fn new_context(&self) {}

        fn operate(
            &self,
            _context: &mut (),
            _group: &TupleEntry,
            entries: &mut dyn GroupIterator,
            output: &mut dyn OutputCollector,
        ) -> std::result::Result<(), OpError> {
            let n = drain_count(entries)? as i64;
            output.collect(tuple![n])
        }
    }

    #[test]
    fn inner_join_pairs_matching_keys() {
        let s = shuffle();
        let out = CoGroup::new(&s, Joiner::Inner)
            .every_buffer(&[people(), orders()], &all_rows())
            .unwrap();
        assert_eq!(
            out.tuples,
            vec![
                tuple![1i32, 1i32, "ann", 1i32, "tea"],
                tuple![1i32, 1i32, "ann", 1i32, "pen"],
                tuple![3i32, 3i32, "cy", 3i32, "jam"],
            ]
        );
        assert_eq!(out.groups, 4);
    }

    #[test]
    fn operate_runs_for_keys_with_empty_join() {
        let s = shuffle();
        let op = JoinSize {
            declared: Fields::new(["n"]).unwrap(),
        };
        let out = CoGroup::new(&s, Joiner::Inner)
            .every_buffer(&[people(), orders()], &op)
            .unwrap();
        assert_eq!(
            out.tuples,
            vec![
                tuple![1i32, 2i64],
                tuple![2i32, 0i64],
                tuple![3i32, 1i64],
                tuple![4i32, 0i64],
            ]
        );
    }

    #[test]
    fn outer_left_right_padding() {
        let s = shuffle();
        let run = |joiner| {
            CoGroup::new(&s, joiner)
                .every_buffer(&[people(), orders()], &all_rows())
                .unwrap()
                .tuples
        };

        let outer = run(Joiner::Outer);
        assert_eq!(outer.len(), 5);
        assert!(outer.contains(&tuple![2i32, 2i32, "bob", Value::Null, Value::Null]));
        assert!(outer.contains(&tuple![4i32, Value::Null, Value::Null, 4i32, "ink"]));

        let left = run(Joiner::Left);
        assert_eq!(left.len(), 4);
        assert!(left.contains(&tuple![2i32, 2i32, "bob", Value::Null, Value::Null]));
        assert!(!left.iter().any(|t| t.get(0) == Some(&Value::I32(4))));

        let right = run(Joiner::Right);
        assert_eq!(right.len(), 4);
        assert!(right.contains(&tuple![4i32, Value::Null, Value::Null, 4i32, "ink"]));
        assert!(!right.iter().any(|t| t.get(0) == Some(&Value::I32(2))));
    }

    #[test]
    fn left_and_right_need_two_inputs() {
        let s = shuffle();
        let err = CoGroup::new(&s, Joiner::Left)
            .every_buffer(&[people()], &all_rows())
            .unwrap_err();
        assert!(matches!(err, ExecError::Invalid(_)));
    }

    #[test]
    fn join_iterator_cross_product_order() {
        let sides = vec![
            vec![tuple!["a"], tuple!["b"]],
            vec![tuple![1i32], tuple![2i32]],
        ];
        let mut it = JoinIterator::new(Fields::new(["s", "n"]).unwrap(), &sides);
        let mut seen = Vec::new();
        while let Some(entry) = it.next_entry().unwrap() {
            seen.push(entry.tuple.clone());
        }
        assert_eq!(
            seen,
            vec![
                tuple!["a", 1i32],
                tuple!["a", 2i32],
                tuple!["b", 1i32],
                tuple!["b", 2i32],
            ]
        );

        let empty = vec![vec![tuple!["a"]], vec![]];
        let mut it = JoinIterator::new(Fields::new(["s", "n"]).unwrap(), &empty);
        assert!(it.next_entry().unwrap().is_none());
    }
}
