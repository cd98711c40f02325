//! Stream-indexed tuple codec.
//!
//! Layout:
//! [ stream index: varint ][ tuple (see `tuple.rs`) ]
//!
//! Used to multiplex several logical inputs through one sortable channel.

use std::io::{Read, Write};

use tuplestream_core::id::StreamIndex;
use tuplestream_core::types::IndexTuple;

use crate::error::{Error, Result};
use crate::tuple::TupleCodec;
use crate::varint::{read_varint_u32, write_varint};

#[derive(Debug, Clone)]
pub struct IndexedTupleCodec {
    tuples: TupleCodec,
}

impl IndexedTupleCodec {
    pub fn new(tuples: TupleCodec) -> Self {
        Self { tuples }
    }

    pub fn tuple_codec(&self) -> &TupleCodec {
        &self.tuples
    }

    pub fn write(&self, indexed: &IndexTuple, out: &mut dyn Write) -> Result<()> {
        write_varint(out, u64::from(indexed.index.get()))?;
        self.tuples.write(&indexed.tuple, out)
    }

    pub fn read(&self, input: &mut dyn Read) -> Result<IndexTuple> {
        let mut indexed = IndexTuple::default();
        self.read_into(input, &mut indexed)?;
        Ok(indexed)
    }

    /// Overwrite `reuse` in place: its index and the contents of its tuple.
    pub fn read_into(&self, input: &mut dyn Read, reuse: &mut IndexTuple) -> Result<()> {
        reuse.index = StreamIndex::new(read_varint_u32(input)?);
        self.tuples.read_into(input, &mut reuse.tuple)
    }

    /// Deserializer entry point with an optional reuse target.
    ///
    /// `None` always allocates a fresh `IndexTuple`; `Some(instance)` decodes
    /// into that instance and hands the same instance back.
    pub fn deserialize(
        &self,
        input: &mut dyn Read,
        reuse: Option<IndexTuple>,
    ) -> Result<IndexTuple> {
        match reuse {
            None => self.read(input),
            Some(mut instance) => {
                self.read_into(input, &mut instance)?;
                Ok(instance)
            }
        }
    }

    pub fn encode_to_vec(&self, indexed: &IndexTuple) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(indexed, &mut out)?;
        Ok(out)
    }

    /// Decode a whole buffer; trailing bytes are an error.
    pub fn decode_slice(&self, mut bytes: &[u8]) -> Result<IndexTuple> {
        let indexed = self.read(&mut bytes)?;
        if !bytes.is_empty() {
            return Err(Error::Malformed(format!(
                "{} trailing bytes after indexed tuple",
                bytes.len()
            )));
        }
        Ok(indexed)
    }

    /// Decode into `reuse` from a whole buffer.
    pub fn decode_slice_into(&self, mut bytes: &[u8], reuse: &mut IndexTuple) -> Result<()> {
        self.read_into(&mut bytes, reuse)?;
        if !bytes.is_empty() {
            return Err(Error::Malformed(format!(
                "{} trailing bytes after indexed tuple",
                bytes.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeCodecRegistry;
    use tuplestream_core::tuple;
    use tuplestream_core::types::Value;

    fn codec() -> IndexedTupleCodec {
        IndexedTupleCodec::new(TupleCodec::new(
            TypeCodecRegistry::with_builtins().into_shared(),
        ))
    }

    #[test]
    fn index_round_trip() {
        let c = codec();
        for index in [0u32, 1, 127, 128, 70_000, u32::MAX] {
            let it = IndexTuple::new(index, tuple!["x", Value::Null, 4i64]);
            let bytes = c.encode_to_vec(&it).unwrap();
            assert_eq!(c.decode_slice(&bytes).unwrap(), it);
        }
    }

    #[test]
    fn deserialize_without_target_allocates() {
        let c = codec();
        let it = IndexTuple::new(3u32, tuple![1i32]);
        let bytes = c.encode_to_vec(&it).unwrap();
        let mut input: &[u8] = &bytes;
        assert_eq!(c.deserialize(&mut input, None).unwrap(), it);
    }

    #[test]
    fn deserialize_into_target_keeps_instance() {
        let c = codec();
        let reuse = IndexTuple::new(9u32, tuple!["old", "row", "wider"]);
        let ptr = reuse.tuple.values().as_ptr();

        let it = IndexTuple::new(1u32, tuple!["new"]);
        let bytes = c.encode_to_vec(&it).unwrap();
        let mut input: &[u8] = &bytes;
        let out = c.deserialize(&mut input, Some(reuse)).unwrap();

        assert_eq!(out, it);
        assert_eq!(out.tuple.values().as_ptr(), ptr);
    }

    #[test]
    fn index_wider_than_u32_is_malformed() {
        let c = codec();
        // varint for 2^32, then an empty tuple
        let bytes = [0x80u8, 0x80, 0x80, 0x80, 0x10, 0x00];
        assert!(matches!(c.decode_slice(&bytes), Err(Error::Malformed(_))));
    }
}
