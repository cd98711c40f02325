//! Built-in value codecs.
//!
//! Fixed-width numerics are little-endian; strings and binaries carry a varint
//! length prefix checked against `CodecLimits::max_payload_len`.

use std::io::{Read, Write};

use tuplestream_core::config::CodecLimits;
use tuplestream_core::schema::DataType;
use tuplestream_core::types::{ExtValue, Value};

use crate::error::{Error, Result};
use crate::registry::ValueCodec;
use crate::varint::{read_array, read_len_prefixed, read_u8, write_len_prefixed};

/// Exact codecs for the built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Bool,
    I32,
    I64,
    F32,
    F64,
    Str,
    Bin,
}

impl Builtin {
    fn name(self) -> &'static str {
        match self {
            Builtin::Bool => "bool",
            Builtin::I32 => "i32",
            Builtin::I64 => "i64",
            Builtin::F32 => "f32",
            Builtin::F64 => "f64",
            Builtin::Str => "utf8",
            Builtin::Bin => "binary",
        }
    }

    /// The builtin codec that handles `dt`, if any.
    pub fn for_type(dt: &DataType) -> Option<Self> {
        match dt {
            DataType::Boolean => Some(Builtin::Bool),
            DataType::Int32 => Some(Builtin::I32),
            DataType::Int64 => Some(Builtin::I64),
            DataType::Float32 => Some(Builtin::F32),
            DataType::Float64 => Some(Builtin::F64),
            DataType::Utf8 => Some(Builtin::Str),
            DataType::Binary => Some(Builtin::Bin),
            DataType::Ext(_) => None,
        }
    }
}

impl ValueCodec for Builtin {
    fn write(&self, value: &Value, out: &mut dyn Write) -> Result<()> {
        match (self, value) {
            (Builtin::Bool, Value::Bool(b)) => out.write_all(&[*b as u8])?,
            (Builtin::I32, Value::I32(i)) => out.write_all(&i.to_le_bytes())?,
            (Builtin::I64, Value::I64(i)) => out.write_all(&i.to_le_bytes())?,
            (Builtin::F32, Value::F32(f)) => out.write_all(&f.to_le_bytes())?,
            (Builtin::F64, Value::F64(f)) => out.write_all(&f.to_le_bytes())?,
            (Builtin::Str, Value::Str(s)) => write_len_prefixed(out, s.as_bytes())?,
            (Builtin::Bin, Value::Bin(b)) => write_len_prefixed(out, b)?,
            (codec, other) => {
                return Err(Error::CodecMismatch {
                    codec: codec.name().to_string(),
                    found: other.type_label().to_string(),
                })
            }
        }
        Ok(())
    }

    fn read(&self, input: &mut dyn Read, limits: &CodecLimits) -> Result<Value> {
        Ok(match self {
            Builtin::Bool => match read_u8(input)? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                b => return Err(Error::Malformed(format!("bool byte {b}"))),
            },
            Builtin::I32 => Value::I32(i32::from_le_bytes(read_array(input)?)),
            Builtin::I64 => Value::I64(i64::from_le_bytes(read_array(input)?)),
            Builtin::F32 => Value::F32(f32::from_le_bytes(read_array(input)?)),
            Builtin::F64 => Value::F64(f64::from_le_bytes(read_array(input)?)),
            Builtin::Str => {
                let bytes = read_len_prefixed(input, limits.max_payload_len)?;
                Value::Str(
                    String::from_utf8(bytes)
                        .map_err(|e| Error::Malformed(format!("utf8: {e}")))?,
                )
            }
            Builtin::Bin => Value::Bin(read_len_prefixed(input, limits.max_payload_len)?),
        })
    }
}

/// One codec for every numeric type, registered under `TypeFamily::Numeric`.
///
/// Writes a one-byte sub-kind before the payload so the exact type survives
/// the round trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericCodec;

const KIND_I32: u8 = 0;
const KIND_I64: u8 = 1;
const KIND_F32: u8 = 2;
const KIND_F64: u8 = 3;

impl ValueCodec for NumericCodec {
    fn write(&self, value: &Value, out: &mut dyn Write) -> Result<()> {
        let (kind, codec) = match value {
            Value::I32(_) => (KIND_I32, Builtin::I32),
            Value::I64(_) => (KIND_I64, Builtin::I64),
            Value::F32(_) => (KIND_F32, Builtin::F32),
            Value::F64(_) => (KIND_F64, Builtin::F64),
            other => {
                return Err(Error::CodecMismatch {
                    codec: "numeric".into(),
                    found: other.type_label().to_string(),
                })
            }
        };
        out.write_all(&[kind])?;
        codec.write(value, out)
    }

    fn read(&self, input: &mut dyn Read, limits: &CodecLimits) -> Result<Value> {
        let codec = match read_u8(input)? {
            KIND_I32 => Builtin::I32,
            KIND_I64 => Builtin::I64,
            KIND_F32 => Builtin::F32,
            KIND_F64 => Builtin::F64,
            k => return Err(Error::Malformed(format!("numeric sub-kind {k}"))),
        };
        codec.read(input, limits)
    }
}

/// Codec for an `Ext` type made of a fixed list of built-in components.
///
/// The component types are known from registration, so each component costs a
/// presence byte plus its payload instead of a full tag.
#[derive(Debug, Clone)]
pub struct StructCodec {
    type_name: String,
    components: Vec<Builtin>,
}

impl StructCodec {
    /// Every component must be a built-in scalar type.
    pub fn new(type_name: impl Into<String>, components: &[DataType]) -> Result<Self> {
        let type_name = type_name.into();
        let components = components
            .iter()
            .map(|dt| {
                Builtin::for_type(dt).ok_or_else(|| Error::UnregisteredType {
                    type_name: dt.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            type_name,
            components,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl ValueCodec for StructCodec {
    fn write(&self, value: &Value, out: &mut dyn Write) -> Result<()> {
        let ext = match value {
            Value::Ext(ext) if ext.type_name == self.type_name => ext,
            other => {
                return Err(Error::CodecMismatch {
                    codec: self.type_name.clone(),
                    found: other.type_label().to_string(),
                })
            }
        };
        if ext.fields.len() != self.components.len() {
            return Err(Error::Malformed(format!(
                "'{}' expects {} components, got {}",
                self.type_name,
                self.components.len(),
                ext.fields.len()
            )));
        }
        for (codec, field) in self.components.iter().zip(&ext.fields) {
            if field.is_null() {
                out.write_all(&[0])?;
            } else {
                out.write_all(&[1])?;
                codec.write(field, out)?;
            }
        }
        Ok(())
    }

    fn read(&self, input: &mut dyn Read, limits: &CodecLimits) -> Result<Value> {
        let mut fields = Vec::with_capacity(self.components.len());
        for codec in &self.components {
            match read_u8(input)? {
                0 => fields.push(Value::Null),
                1 => fields.push(codec.read(input, limits)?),
                b => return Err(Error::Malformed(format!("presence byte {b}"))),
            }
        }
        Ok(Value::Ext(ExtValue::new(self.type_name.clone(), fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(codec: &dyn ValueCodec, v: &Value) -> Value {
        let mut buf = Vec::new();
        codec.write(v, &mut buf).unwrap();
        let mut input: &[u8] = &buf;
        let out = codec.read(&mut input, &CodecLimits::default()).unwrap();
        assert!(input.is_empty(), "trailing bytes after {v:?}");
        out
    }

    #[test]
    fn builtin_round_trips() {
        let cases = [
            (Builtin::Bool, Value::Bool(true)),
            (Builtin::I32, Value::I32(i32::MIN)),
            (Builtin::I64, Value::I64(-42)),
            (Builtin::F32, Value::F32(1.25)),
            (Builtin::F64, Value::F64(f64::MAX)),
            (Builtin::Str, Value::Str("héllo".into())),
            (Builtin::Bin, Value::Bin(vec![0, 255, 7])),
        ];
        for (codec, v) in cases {
            assert_eq!(round_trip(&codec, &v), v);
        }
    }

    #[test]
    fn builtin_rejects_wrong_variant() {
        let mut buf = Vec::new();
        let err = Builtin::I32.write(&Value::Str("x".into()), &mut buf).unwrap_err();
        assert!(matches!(err, Error::CodecMismatch { .. }));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let mut buf = Vec::new();
        write_len_prefixed(&mut buf, &[0xff, 0xfe]).unwrap();
        let mut input: &[u8] = &buf;
        assert!(matches!(
            Builtin::Str.read(&mut input, &CodecLimits::default()),
            Err(Error::Malformed(_))
        ));
    }

    #[test]
    fn numeric_keeps_exact_type() {
        for v in [Value::I32(7), Value::I64(7), Value::F32(7.5), Value::F64(-0.5)] {
            assert_eq!(round_trip(&NumericCodec, &v), v);
        }
    }

    #[test]
    fn struct_codec_with_null_component() {
        let codec = StructCodec::new("point", &[DataType::Float64, DataType::Float64]).unwrap();
        let v = Value::Ext(ExtValue::new("point", vec![Value::F64(1.0), Value::Null]));
        assert_eq!(round_trip(&codec, &v), v);

        let wrong_arity = Value::Ext(ExtValue::new("point", vec![Value::F64(1.0)]));
        assert!(codec.write(&wrong_arity, &mut Vec::new()).is_err());
    }

    #[test]
    fn struct_codec_rejects_ext_components() {
        let err = StructCodec::new("nested", &[DataType::Ext("point".into())]).unwrap_err();
        assert!(matches!(err, Error::UnregisteredType { .. }));
    }
}
