//! Reference aggregators built on the `Aggregator` contract.

pub mod count;
pub mod extent;

pub use count::Count;
pub use extent::{Extent, ExtentContext, ExtentPolicy, First, KeepFirst, KeepLast, Last};
