#![forbid(unsafe_code)]
//! tuplestream: typed tuple serialization and grouped operations over a
//! sorted shuffle.
//!
//! Facade over the workspace crates:
//! - `tuplestream_core`: tuples, fields, ids, config, hashing
//! - `tuplestream_codec`: type codec registry and tuple codecs
//! - `tuplestream_operators`: grouping comparator and the Aggregator/Buffer contract
//! - `tuplestream_exec`: local shuffle, group-by and co-group runner

pub use tuplestream_codec;
pub use tuplestream_core;
pub use tuplestream_exec;
pub use tuplestream_operators;
