//! Co-group joins driving a Buffer.

use tuplestream_codec::TypeCodecRegistry;
use tuplestream_core::prelude::{EngineConfig, Fields, Tuple, TupleEntry, Value};
use tuplestream_core::tuple;
use tuplestream_exec::{CoGroup, ExecError, Joiner, Shuffle, ShuffleInput};
use tuplestream_operators::{Buffer, GroupIterator, OpError, Operation, OutputCollector};

fn shuffle(num_partitions: usize, max_parallel_tasks: usize) -> Shuffle {
    let config = EngineConfig {
        num_partitions,
        max_parallel_tasks,
        ..EngineConfig::default()
    };
    Shuffle::new(TypeCodecRegistry::with_builtins().into_shared(), config)
        .expect("valid shuffle config")
}

fn lhs(rows: Vec<Tuple>) -> ShuffleInput {
    ShuffleInput::new(
        Fields::new(["k", "l"]).expect("fields"),
        Fields::new(["k"]).expect("group fields"),
        rows,
    )
}

fn rhs(rows: Vec<Tuple>) -> ShuffleInput {
    ShuffleInput::new(
        Fields::new(["rk", "r"]).expect("fields"),
        Fields::new(["rk"]).expect("group fields"),
        rows,
    )
}

/// Emits one summary row per key: how many joined rows it saw and the
/// grouping value taken from the group entry.
struct KeySummary {
    declared: Fields,
}

impl KeySummary {
    fn new() -> Self {
        Self {
            declared: Fields::new(["group_value", "joined"]).expect("fields"),
        }
    }
}

impl Operation for KeySummary {
    fn name(&self) -> &'static str {
        "key_summary"
    }

    fn field_declaration(&self) -> &Fields {
        &self.declared
    }
}

impl Buffer for KeySummary {
    type Context = Vec<Tuple>;

    fn new_context(&self) -> Vec<Tuple> {
        Vec::new()
    }

    fn operate(
        &self,
        seen: &mut Vec<Tuple>,
        group: &TupleEntry,
        entries: &mut dyn GroupIterator,
        output: &mut dyn OutputCollector,
    ) -> Result<(), OpError> {
        seen.clear();
        while let Some(entry) = entries.next_entry()? {
            seen.push(entry.tuple.clone());
        }
        let key = group.tuple.get(0).cloned().unwrap_or(Value::Null);
        output.collect(tuple![key, seen.len() as i64])
    }
}

#[test]
fn test_inner_join_operates_on_keys_without_matches() {
    let s = shuffle(1, 1);
    let out = CoGroup::new(&s, Joiner::Inner)
        .every_buffer(
            &[
                lhs(vec![tuple!["x", 1i32], tuple!["y", 2i32]]),
                rhs(vec![tuple!["x", 10i32], tuple!["z", 30i32]]),
            ],
            &KeySummary::new(),
        )
        .expect("cogroup");

    // "y" and "z" produce no joined rows, yet each still gets an operate call
    // with its grouping value available.
    assert_eq!(
        out.tuples,
        vec![
            tuple!["x", "x", 1i64],
            tuple!["y", "y", 0i64],
            tuple!["z", "z", 0i64],
        ]
    );
    assert_eq!(out.groups, 3);
}

#[test]
fn test_outer_join_null_pads_missing_sides() {
    for (partitions, tasks) in [(1, 1), (3, 2)] {
        let s = shuffle(partitions, tasks);
        let lhs_fields = Fields::new(["a", "b", "c", "d"]).expect("fields");
        let mut rows = CoGroup::new(&s, Joiner::Outer)
            .every_buffer(
                &[
                    lhs(vec![tuple!["x", 1i32], tuple!["y", 2i32]]),
                    rhs(vec![tuple!["x", 10i32], tuple!["z", 30i32]]),
                ],
                &tuplestream_operators::FirstNBuffer::new(lhs_fields, usize::MAX),
            )
            .expect("cogroup")
            .tuples;
        rows.sort_by_key(|t| format!("{t:?}"));
        assert_eq!(
            rows,
            vec![
                tuple!["x", "x", 1i32, "x", 10i32],
                tuple!["y", "y", 2i32, Value::Null, Value::Null],
                tuple!["z", Value::Null, Value::Null, "z", 30i32],
            ]
        );
    }
}

#[test]
fn test_three_way_inner_cross_product() {
    let s = shuffle(1, 1);
    let third = ShuffleInput::new(
        Fields::new(["tk", "t"]).expect("fields"),
        Fields::new(["tk"]).expect("group fields"),
        vec![tuple!["x", "p"], tuple!["x", "q"]],
    );
    let out = CoGroup::new(&s, Joiner::Inner)
        .every_buffer(
            &[
                lhs(vec![tuple!["x", 1i32], tuple!["x", 2i32]]),
                rhs(vec![tuple!["x", 10i32]]),
                third,
            ],
            &KeySummary::new(),
        )
        .expect("cogroup");
    assert_eq!(out.tuples, vec![tuple!["x", "x", 4i64]]);
}

#[test]
fn test_left_join_requires_two_inputs() {
    let s = shuffle(1, 1);
    let err = CoGroup::new(&s, Joiner::Left)
        .every_buffer(&[lhs(vec![])], &KeySummary::new())
        .expect_err("one input");
    assert!(matches!(err, ExecError::Invalid(_)));
}
