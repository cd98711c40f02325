//! Total order over serialized grouping keys.
//!
//! A shuffle key is an `IndexTuple` whose tuple holds exactly the grouping
//! values. Keys order by those values first (lexicographically, nulls first)
//! and then by ascending stream index, so rows from different inputs sharing
//! a key sort next to each other in input order. Group equality ignores the
//! stream index.

use std::cmp::Ordering;

use tuplestream_codec::IndexedTupleCodec;
use tuplestream_core::types::{IndexTuple, Tuple, Value};

use crate::traits::OpError;

#[derive(Debug, Clone)]
pub struct GroupingComparator {
    codec: IndexedTupleCodec,
}

impl GroupingComparator {
    pub fn new(codec: IndexedTupleCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &IndexedTupleCodec {
        &self.codec
    }

    /// Order two decoded shuffle keys: grouping values, then stream index.
    pub fn compare(&self, a: &IndexTuple, b: &IndexTuple) -> Result<Ordering, OpError> {
        Ok(compare_keys(&a.tuple, &b.tuple)?.then(a.index.cmp(&b.index)))
    }

    /// True iff the grouping values are equal, whatever the origin stream.
    pub fn same_group(&self, a: &IndexTuple, b: &IndexTuple) -> Result<bool, OpError> {
        Ok(compare_keys(&a.tuple, &b.tuple)? == Ordering::Equal)
    }

    pub fn compare_serialized(&self, a: &[u8], b: &[u8]) -> Result<Ordering, OpError> {
        let a = self.codec.decode_slice(a)?;
        let b = self.codec.decode_slice(b)?;
        self.compare(&a, &b)
    }

    pub fn same_group_serialized(&self, a: &[u8], b: &[u8]) -> Result<bool, OpError> {
        let a = self.codec.decode_slice(a)?;
        let b = self.codec.decode_slice(b)?;
        self.same_group(&a, &b)
    }
}

/// Lexicographic comparison of two grouping-key tuples.
///
/// A shorter key that is a prefix of a longer one sorts first.
pub fn compare_keys(a: &Tuple, b: &Tuple) -> Result<Ordering, OpError> {
    for (position, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        match compare_values(position, x, y)? {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(a.len().cmp(&b.len()))
}

/// Compare two values found at the same grouping position.
///
/// Nulls sort first. Numerics compare by value across widths and int/float.
/// Any other pair of differing types is a `TypeMismatch`.
pub fn compare_values(position: usize, a: &Value, b: &Value) -> Result<Ordering, OpError> {
    use Value::*;
    let ord = match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (Str(x), Str(y)) => x.cmp(y),
        (Bin(x), Bin(y)) => x.cmp(y),
        (Ext(x), Ext(y)) if x.type_name == y.type_name => {
            for (fx, fy) in x.fields.iter().zip(&y.fields) {
                match compare_values(position, fx, fy)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            x.fields.len().cmp(&y.fields.len())
        }
        _ => match (Num::of(a), Num::of(b)) {
            (Some(x), Some(y)) => x.total_cmp(y),
            _ => {
                return Err(OpError::TypeMismatch {
                    position,
                    left: a.type_label().to_string(),
                    right: b.type_label().to_string(),
                })
            }
        },
    };
    Ok(ord)
}

#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(v: &Value) -> Option<Num> {
        match v {
            Value::I32(i) => Some(Num::Int(i64::from(*i))),
            Value::I64(i) => Some(Num::Int(*i)),
            Value::F32(f) => Some(Num::Float(f64::from(*f))),
            Value::F64(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    // NaN sorts after every other number and equals itself.
    fn total_cmp(self, other: Num) -> Ordering {
        match (self, other) {
            (Num::Int(x), Num::Int(y)) => x.cmp(&y),
            (Num::Float(x), Num::Float(y)) => cmp_floats(x, y),
            (Num::Int(x), Num::Float(y)) => cmp_int_float(x, y),
            (Num::Float(x), Num::Int(y)) => cmp_int_float(y, x).reverse(),
        }
    }
}

fn cmp_floats(x: f64, y: f64) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        // -0.0 == 0.0 here, matching the partition hash.
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a float, without rounding the integer.
fn cmp_int_float(i: i64, f: f64) -> Ordering {
    const TWO_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= TWO_63 {
        return Ordering::Less;
    }
    if f < -TWO_63 {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => {
            let frac = f - whole;
            if frac > 0.0 {
                Ordering::Less
            } else if frac < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        other => other,
    }
}
