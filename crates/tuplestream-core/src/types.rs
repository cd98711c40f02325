//! Row-level values: `Value`, `Tuple`, `TupleEntry` and `IndexTuple`.
//!
//! Tuples are schema-less and duck-typed per position. The engine reuses tuple
//! buffers across rows, so anything that must outlive a call takes a `clone()`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::StreamIndex;
use crate::schema::{DataType, Fields};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Ext(ExtValue),
}

/// A value of a user-registered composite type.
///
/// The components are plain values; how they are laid out on the wire is up to
/// the codec registered for `type_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtValue {
    pub type_name: String,
    pub fields: Vec<Value>,
}

impl ExtValue {
    pub fn new(type_name: impl Into<String>, fields: Vec<Value>) -> Self {
        Self {
            type_name: type_name.into(),
            fields,
        }
    }
}

impl Value {
    /// `None` for `Null`, which is typeless and encoded with a reserved tag.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DataType::Boolean),
            Value::I32(_) => Some(DataType::Int32),
            Value::I64(_) => Some(DataType::Int64),
            Value::F32(_) => Some(DataType::Float32),
            Value::F64(_) => Some(DataType::Float64),
            Value::Str(_) => Some(DataType::Utf8),
            Value::Bin(_) => Some(DataType::Binary),
            Value::Ext(ext) => Some(DataType::Ext(ext.type_name.clone())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type label for error messages; avoids allocating for ext types.
    pub fn type_label(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Str(_) => "utf8",
            Value::Bin(_) => "binary",
            Value::Ext(ext) => &ext.type_name,
        }
    }

    /// Type-sensitive equality under which NaN equals NaN and -0.0 equals 0.0,
    /// matching the grouping order. `PartialEq` keeps IEEE semantics.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::F32(x), Value::F32(y)) => (x.is_nan() && y.is_nan()) || x == y,
            (Value::F64(x), Value::F64(y)) => (x.is_nan() && y.is_nan()) || x == y,
            (Value::Ext(x), Value::Ext(y)) => {
                x.type_name == y.type_name
                    && x.fields.len() == y.fields.len()
                    && x.fields.iter().zip(&y.fields).all(|(a, b)| a.same_as(b))
            }
            (a, b) => a == b,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bin(v)
    }
}

impl From<ExtValue> for Value {
    fn from(v: ExtValue) -> Self {
        Value::Ext(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I32(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F32(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v:?}"),
            Value::Bin(v) => write!(f, "<{} bytes>", v.len()),
            Value::Ext(ext) => {
                write!(f, "{}(", ext.type_name)?;
                for (i, v) in ext.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// An ordered sequence of values forming one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self(Vec::with_capacity(cap))
    }

    /// A tuple of `arity` nulls; used to pad the missing side of an outer join.
    pub fn nulls(arity: usize) -> Self {
        Self(vec![Value::Null; arity])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Value> {
        self.0.get(pos)
    }

    pub fn set(&mut self, pos: usize, value: Value) -> Result<()> {
        let len = self.0.len();
        let slot = self
            .0
            .get_mut(pos)
            .ok_or_else(|| Error::Invariant(format!("position {pos} out of range ({len})")))?;
        *slot = value;
        Ok(())
    }

    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    /// Drop all values but keep the allocation for the next row.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn reserve(&mut self, additional: usize) {
        self.0.reserve(additional);
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    /// Copy the values at `positions`, in that order, into a new tuple.
    pub fn select(&self, positions: &[usize]) -> Result<Tuple> {
        positions
            .iter()
            .map(|&pos| {
                self.0.get(pos).cloned().ok_or_else(|| {
                    Error::Invariant(format!("position {pos} out of range ({})", self.0.len()))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Tuple)
    }

    /// Append copies of `other`'s values to the end of this tuple.
    pub fn append(&mut self, other: &Tuple) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    /// Element-wise `Value::same_as`.
    pub fn same_as(&self, other: &Tuple) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a.same_as(b))
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

/// Build a `Tuple` from a list of values convertible into `Value`.
#[macro_export]
macro_rules! tuple {
    () => { $crate::types::Tuple::default() };
    ($($v:expr),+ $(,)?) => {
        $crate::types::Tuple::new(vec![$($crate::types::Value::from($v)),+])
    };
}

/// A tuple paired with the field names describing its positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TupleEntry {
    pub fields: Fields,
    pub tuple: Tuple,
}

impl TupleEntry {
    pub fn new(fields: Fields, tuple: Tuple) -> Self {
        Self { fields, tuple }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.index_of(name).and_then(|pos| self.tuple.get(pos))
    }

    pub fn tuple(&self) -> &Tuple {
        &self.tuple
    }

    /// Project onto `selector`, producing an owned entry.
    pub fn selected(&self, selector: &Fields) -> Result<TupleEntry> {
        let positions = self.fields.positions_of(selector)?;
        Ok(TupleEntry::new(selector.clone(), self.tuple.select(&positions)?))
    }
}

/// A tuple tagged with the logical stream it came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexTuple {
    pub index: StreamIndex,
    pub tuple: Tuple,
}

impl IndexTuple {
    pub fn new(index: impl Into<StreamIndex>, tuple: Tuple) -> Self {
        Self {
            index: index.into(),
            tuple,
        }
    }

    /// Strip the stream index once the row has been demultiplexed.
    pub fn into_tuple(self) -> Tuple {
        self.tuple
    }
}
