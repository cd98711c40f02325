//! Grouped-operation contract.
//!
//! The shuffle substrate sorts rows by grouping key and then calls, per group:
//! - an `Aggregator` through `start` → `aggregate`* → `complete`, or
//! - a `Buffer` through a single `operate` with a lazy iterator over the group.
//!
//! Invariants:
//! - Operation instances are shared across partitions and threads (`Send + Sync`)
//!   and keep no per-group state in `self`. All per-group state lives in the
//!   caller-owned `Context`, which is never shared between concurrent groups.
//! - Entries handed to an operation are borrowed from buffers the engine reuses
//!   for the next row. Keeping one past the call means cloning it.

use serde::Serialize;
use thiserror::Error;

use tuplestream_core::hash::Hash256;
use tuplestream_core::schema::Fields;
use tuplestream_core::types::{Tuple, TupleEntry};

#[derive(Debug, Error)]
pub enum OpError {
    #[error("codec error: {0}")]
    Codec(#[from] tuplestream_codec::Error),

    #[error("core error: {0}")]
    Core(#[from] tuplestream_core::Error),

    #[error("type mismatch at grouping field {position}: cannot compare '{left}' with '{right}'")]
    TypeMismatch {
        position: usize,
        left: String,
        right: String,
    },

    #[error("execution error: {0}")]
    Exec(String),
}

/// Configuration identity of an operation.
///
/// Two instances with equal signatures behave identically, so the engine may
/// deduplicate or cache them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OperationSignature {
    pub name: &'static str,
    pub declared: Fields,
    pub config: Hash256,
}

/// Capabilities shared by every grouped operation.
pub trait Operation: Send + Sync {
    /// Human-readable operation name (stable).
    fn name(&self) -> &'static str;

    /// Fields of the tuples this operation emits.
    fn field_declaration(&self) -> &Fields;

    /// Hash of any configuration beyond the name and field declaration.
    fn config_hash(&self) -> Hash256 {
        Hash256::default()
    }

    fn signature(&self) -> OperationSignature {
        OperationSignature {
            name: self.name(),
            declared: self.field_declaration().clone(),
            config: self.config_hash(),
        }
    }
}

/// Sink for result tuples emitted by an operation.
pub trait OutputCollector {
    fn collect(&mut self, tuple: Tuple) -> Result<(), OpError>;
}

impl OutputCollector for Vec<Tuple> {
    fn collect(&mut self, tuple: Tuple) -> Result<(), OpError> {
        self.push(tuple);
        Ok(())
    }
}

/// Forward-only, single-pass view over the entries of one group.
///
/// Each returned entry is only valid until the next call.
pub trait GroupIterator {
    fn next_entry(&mut self) -> Result<Option<&TupleEntry>, OpError>;
}

/// Per-group start / row / complete lifecycle; emits at most one tuple per group.
pub trait Aggregator: Operation {
    /// Per-group accumulator, owned by the caller.
    type Context: Send;

    /// Allocate a context. The caller may reuse it for many groups in turn.
    fn new_context(&self) -> Self::Context;

    /// Called exactly once per group, before any `aggregate`. Must reset
    /// everything a previous group left in `context`.
    fn start(&self, context: &mut Self::Context, group: &TupleEntry) -> Result<(), OpError>;

    /// Called once per row of the group, in engine order.
    fn aggregate(&self, context: &mut Self::Context, arguments: &TupleEntry)
        -> Result<(), OpError>;

    /// Called exactly once per group after the last `aggregate`; the only
    /// place output may be emitted.
    fn complete(
        &self,
        context: &mut Self::Context,
        group: &TupleEntry,
        output: &mut dyn OutputCollector,
    ) -> Result<(), OpError>;
}

/// Whole-group operation; `operate` runs once per group, even an empty one.
pub trait Buffer: Operation {
    type Context: Send;

    fn new_context(&self) -> Self::Context;

    /// `group` carries the grouping key independently of `entries`, so it is
    /// available when the iterator yields nothing.
    fn operate(
        &self,
        context: &mut Self::Context,
        group: &TupleEntry,
        entries: &mut dyn GroupIterator,
        output: &mut dyn OutputCollector,
    ) -> Result<(), OpError>;
}
