//! tacflow - block-level dataflow analysis and register allocation for TAC.
//!
//! tacflow is the backend middle of a small teaching compiler. It takes
//! three-address code one basic block at a time, computes def/use sets,
//! local liveness and DU chains, then colors a per-block interference graph
//! onto a fixed register pool.
//!
//! # Primary Usage
//!
//! ```ignore
//! use tacflow::core::{CompilationSession, RegisterPool};
//! use tacflow::pipeline::BlockPipeline;
//! use tacflow::tac::parse_listing;
//!
//! let mut session = CompilationSession::new();
//! let mut listing = parse_listing(text, &mut session)?;
//! let pipeline = BlockPipeline::new(RegisterPool::mips());
//! let colorings = pipeline.run(&mut session, &mut listing.blocks, &listing.live_outs)?;
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Shared infrastructure (session, register pool, errors)
//! - [`tac`] - Instructions, opcodes, temps and the text reader
//! - [`dataflow`] - Per-block def/use, liveness and DU chains
//! - [`regalloc`] - Interference graph and simplify/select coloring
//! - [`pipeline`] - Runs the passes over the blocks of a function

pub mod core;
pub mod dataflow;
pub mod pipeline;
pub mod regalloc;
pub mod tac;

pub use core::{BackendError, BackendResult, CompilationSession, RegisterPool, SessionStats};
pub use dataflow::{BasicBlock, LiveOut, Terminator};
pub use pipeline::BlockPipeline;
pub use regalloc::{Coloring, RegisterAllocator};
pub use tac::{Opcode, SeqId, Tac, TempId};
