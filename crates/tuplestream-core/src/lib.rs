#![forbid(unsafe_code)]
//! tuplestream-core: the tuple data model shared by every other crate.
//!
//! Pure data plus a few helpers: values, tuples, field lists, stream-indexed
//! tuples, strong ids, stable hashing and the engine configuration. No codec
//! or grouping logic lives here.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use types::{ExtValue, IndexTuple, Tuple, TupleEntry, Value};
