#![forbid(unsafe_code)]
//! tuplestream-exec: a local, in-process shuffle that drives grouped operations.
//!
//! Rows are encoded into (key, value) records, hash-partitioned on the grouping
//! values, sorted with the grouping comparator and handed group by group to
//! `Aggregator`s and `Buffer`s. Partitions may run on scoped worker threads.

pub mod cogroup;
pub mod error;
pub mod group_by;
pub mod metrics;
mod pool;
pub mod shuffle;

pub use cogroup::{CoGroup, JoinIterator, Joiner};
pub use error::{ExecError, Result};
pub use group_by::{GroupBy, GroupOutput};
pub use shuffle::{Partition, Record, Shuffle, ShuffleInput};
