#![forbid(unsafe_code)]
//! tuplestream-operators: grouping order and grouped-operation contract.
//!
//! Design intent:
//! - Keep this crate pure and synchronous; the shuffle substrate drives it.
//! - `GroupingComparator` is the total order the substrate sorts with.
//! - `Aggregator` and `Buffer` are the per-group extension points; operation
//!   instances hold configuration only, never per-group state.

pub mod aggregator;
pub mod buffer;
pub mod comparator;
pub mod group;
pub mod traits;

pub use aggregator::{Count, First, Last};
pub use buffer::FirstNBuffer;
pub use comparator::{compare_keys, compare_values, GroupingComparator};
pub use group::SliceGroup;
pub use traits::{
    Aggregator, Buffer, GroupIterator, OpError, Operation, OperationSignature, OutputCollector,
};
