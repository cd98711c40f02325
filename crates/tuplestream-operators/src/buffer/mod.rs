//! Reference buffers built on the `Buffer` contract.

pub mod first_n;

pub use first_n::FirstNBuffer;
