//! Stable hashing helpers for operation signatures and key partitioning.

use blake3::Hasher;

use crate::types::{Tuple, Value};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }

    /// First eight bytes as a little-endian integer, for bucketing.
    pub fn prefix_u64(&self) -> u64 {
        let mut head = [0u8; 8];
        head.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(head)
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

pub fn hash_str(s: &str) -> Hash256 {
    hash_bytes(s.as_bytes())
}

/// Hash a list of tuples exactly (type-sensitive), e.g. an ignore set.
///
/// The result feeds operation signatures, so two configurations hash equal
/// only if their tuples are equal value by value.
pub fn hash_tuples<'a, I>(label: &str, tuples: I) -> Hash256
where
    I: IntoIterator<Item = &'a Tuple>,
{
    let mut h = Hasher::new();
    h.update(label.as_bytes());
    h.update(&[0xff]);
    for tuple in tuples {
        h.update(&(tuple.len() as u64).to_le_bytes());
        for value in tuple {
            hash_value(value, &mut h, false);
        }
    }
    Hash256(h.finalize().into())
}

/// Hash a grouping key for partitioning.
///
/// Numerics are normalized so that keys equal for grouping (e.g. `I32(1)` and
/// `F64(1.0)`) land in the same partition.
pub fn partition_hash(key: &Tuple) -> Hash256 {
    let mut h = Hasher::new();
    for value in key {
        hash_value(value, &mut h, true);
    }
    Hash256(h.finalize().into())
}

fn type_order(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::I32(_) => 2,
        Value::I64(_) => 3,
        Value::F32(_) => 4,
        Value::F64(_) => 5,
        Value::Str(_) => 6,
        Value::Bin(_) => 7,
        Value::Ext(_) => 8,
    }
}

fn hash_value(value: &Value, hasher: &mut Hasher, normalize_numeric: bool) {
    if normalize_numeric {
        let normalized = match value {
            Value::I32(i) => Some(NumKey::Int(i64::from(*i))),
            Value::I64(i) => Some(NumKey::Int(*i)),
            Value::F32(f) => Some(NumKey::from_float(f64::from(*f))),
            Value::F64(f) => Some(NumKey::from_float(*f)),
            _ => None,
        };
        if let Some(key) = normalized {
            match key {
                NumKey::Int(i) => {
                    hasher.update(&[0x10]);
                    hasher.update(&i.to_le_bytes());
                }
                NumKey::Float(bits) => {
                    hasher.update(&[0x11]);
                    hasher.update(&bits.to_le_bytes());
                }
            }
            return;
        }
    }

    // Write type discriminant first
    hasher.update(&[type_order(value)]);

    match value {
        Value::Null => {}
        Value::Bool(b) => {
            hasher.update(&[*b as u8]);
        }
        Value::I32(i) => {
            hasher.update(&i.to_le_bytes());
        }
        Value::I64(i) => {
            hasher.update(&i.to_le_bytes());
        }
        Value::F32(f) => {
            hasher.update(&f.to_bits().to_le_bytes());
        }
        Value::F64(f) => {
            hasher.update(&f.to_bits().to_le_bytes());
        }
        Value::Str(s) => {
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        Value::Bin(b) => {
            hasher.update(&(b.len() as u64).to_le_bytes());
            hasher.update(b);
        }
        Value::Ext(ext) => {
            hasher.update(&(ext.type_name.len() as u64).to_le_bytes());
            hasher.update(ext.type_name.as_bytes());
            hasher.update(&(ext.fields.len() as u64).to_le_bytes());
            for field in &ext.fields {
                hash_value(field, hasher, normalize_numeric);
            }
        }
    }
}

enum NumKey {
    Int(i64),
    Float(u64),
}

impl NumKey {
    fn from_float(f: f64) -> Self {
        // Integral floats inside the i64 range hash like the integer.
        if f.fract() == 0.0 && (-9.223_372_036_854_775_808e18..9.223_372_036_854_775_808e18).contains(&f) {
            NumKey::Int(f as i64)
        } else if f.is_nan() {
            NumKey::Float(f64::NAN.to_bits())
        } else {
            NumKey::Float(f.to_bits())
        }
    }
}
