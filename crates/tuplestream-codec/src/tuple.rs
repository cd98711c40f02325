//! Tuple wire format.
//!
//! Layout:
//! [ arity: varint ] then per element [ tag: varint ][ payload … ]
//!
//! Tag 0 is null and carries no payload. Every other tag is resolved through
//! the `TypeCodecRegistry`; an unknown tag is fatal.

use std::io::{Read, Write};
use std::sync::Arc;

use tuplestream_core::config::CodecLimits;
use tuplestream_core::types::{Tuple, Value};

use crate::error::{Error, Result};
use crate::registry::{tags, TypeCodecRegistry};
use crate::varint::{read_varint, read_varint_u32, write_varint};

#[derive(Debug, Clone)]
pub struct TupleCodec {
    registry: Arc<TypeCodecRegistry>,
    limits: CodecLimits,
}

impl TupleCodec {
    pub fn new(registry: Arc<TypeCodecRegistry>) -> Self {
        Self::with_limits(registry, CodecLimits::default())
    }

    pub fn with_limits(registry: Arc<TypeCodecRegistry>, limits: CodecLimits) -> Self {
        Self { registry, limits }
    }

    pub fn registry(&self) -> &Arc<TypeCodecRegistry> {
        &self.registry
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    pub fn write(&self, tuple: &Tuple, out: &mut dyn Write) -> Result<()> {
        write_varint(out, tuple.len() as u64)?;
        for value in tuple {
            self.write_value(value, out)?;
        }
        Ok(())
    }

    /// Write one self-describing element: tag, then payload.
    pub fn write_value(&self, value: &Value, out: &mut dyn Write) -> Result<()> {
        if value.is_null() {
            return write_varint(out, u64::from(tags::NULL));
        }
        let (tag, codec) = self.registry.writer_for(value)?;
        write_varint(out, u64::from(tag))?;
        codec.write(value, out)
    }

    pub fn read(&self, input: &mut dyn Read) -> Result<Tuple> {
        let mut tuple = Tuple::default();
        self.read_into(input, &mut tuple)?;
        Ok(tuple)
    }

    /// Decode into `reuse`, overwriting its contents but keeping its allocation.
    ///
    /// On error `reuse` holds a partially decoded row and must not be used.
    pub fn read_into(&self, input: &mut dyn Read, reuse: &mut Tuple) -> Result<()> {
        let arity = read_varint(input)?;
        if arity > self.limits.max_arity as u64 {
            return Err(Error::LimitExceeded {
                what: "tuple arity",
                len: arity,
                limit: self.limits.max_arity,
            });
        }
        reuse.clear();
        reuse.reserve(arity as usize);
        for _ in 0..arity {
            let value = self.read_value(input)?;
            reuse.push(value);
        }
        Ok(())
    }

    pub fn read_value(&self, input: &mut dyn Read) -> Result<Value> {
        let tag = read_varint_u32(input)?;
        if tag == tags::NULL {
            return Ok(Value::Null);
        }
        let codec = self.registry.reader_for(tag)?;
        codec.read(input, &self.limits)
    }

    pub fn encode_to_vec(&self, tuple: &Tuple) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(tuple, &mut out)?;
        Ok(out)
    }

    /// Decode a whole buffer; trailing bytes are an error.
    pub fn decode_slice(&self, mut bytes: &[u8]) -> Result<Tuple> {
        let tuple = self.read(&mut bytes)?;
        if !bytes.is_empty() {
            return Err(Error::Malformed(format!(
                "{} trailing bytes after tuple",
                bytes.len()
            )));
        }
        Ok(tuple)
    }

    /// Decode a whole buffer into `reuse`, keeping its allocation.
    pub fn decode_slice_into(&self, mut bytes: &[u8], reuse: &mut Tuple) -> Result<()> {
        self.read_into(&mut bytes, reuse)?;
        if !bytes.is_empty() {
            return Err(Error::Malformed(format!(
                "{} trailing bytes after tuple",
                bytes.len()
            )));
        }
        Ok(())
    }
}
