#![forbid(unsafe_code)]
//! tuplestream-codec: compact binary codecs for tuples and stream-indexed tuples.
//!
//! A `TypeCodecRegistry` maps each value type to a wire tag and a codec.
//! `TupleCodec` writes rows element by element through the registry, and
//! `IndexedTupleCodec` prefixes a stream index so several inputs can share one
//! sortable byte channel.
//!
//! Codecs only read from / write to a caller-supplied `std::io` channel.

pub mod builtin;
pub mod error;
pub mod indexed;
pub mod registry;
pub mod tuple;
pub mod varint;

pub use builtin::{Builtin, NumericCodec, StructCodec};
pub use error::{Error, Result};
pub use indexed::IndexedTupleCodec;
pub use registry::{tags, TypeCodecRegistry, TypeKey, ValueCodec};
pub use tuple::TupleCodec;
