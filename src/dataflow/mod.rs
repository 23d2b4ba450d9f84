//! Per-block dataflow analysis.
//!
//! A [`BasicBlock`] computes its def/use sets in one forward pass, its local
//! liveness in one backward pass seeded by the boundary [`LiveOut`], and a
//! DU chain for every definition. [`dump`] renders the results.

pub mod block;
pub mod dump;
pub mod pair;

pub use block::{BasicBlock, LiveOut, Terminator};
pub use pair::RefPoint;
