// This module is the home of the infrastructure shared by every backend pass: the
// compilation session that owns the sequence counter, temp table and statistics; the
// register pool the allocator colors with; and the error types the passes return.

//! Core tacflow infrastructure.
//!
//! ## Session Management (`session`)
//! - Sequence ids for instruction ordering
//! - Temp table with bound registers
//! - Statistics
//!
//! ## Registers (`register_file`)
//! - Ordered allocatable pool with a reserved frame pointer
//! - Bit set of taken colors
//!
//! ## Errors (`error`)
//! - `BackendError` and `BackendResult`

pub mod error;
pub mod register_file;
pub mod session;

pub use error::{BackendError, BackendResult};
pub use register_file::{RegBitSet, RegId, Register, RegisterPool, MIPS_FP};
pub use session::{CompilationSession, SessionStats};
