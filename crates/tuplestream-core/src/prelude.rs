//! Convenient re-exports for downstream crates.

pub use crate::config::{CodecLimits, EngineConfig};
pub use crate::error::{Error, Result};
pub use crate::hash::Hash256;
pub use crate::id::{PartitionId, StreamIndex};
pub use crate::schema::{DataType, Fields, TypeFamily};
pub use crate::types::{ExtValue, IndexTuple, Tuple, TupleEntry, Value};
