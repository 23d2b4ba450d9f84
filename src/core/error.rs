// This module defines the error types for the tacflow backend using the thiserror crate.
// BackendError covers the two fatal conditions of the allocation pass: a block whose
// interference graph cannot be colored with the available registers (no spilling is
// implemented), and an instruction missing an operand slot its opcode requires, which
// is a contract violation by the lowering pass that built it. ControlFlowInBlock rejects
// a branch or return left inside a block's instruction list, where the allocator would
// not see the temp it reads. Two further variants
// cover a pipeline asked to process a block index it does not have and malformed input
// to the textual TAC reader. BackendResult<T> is the convenience alias used throughout.

//! Error types for the tacflow backend.

use thiserror::Error;

use crate::tac::{Opcode, Slot};

/// Fatal errors raised by the backend passes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error(
        "Register allocation failed in block {block}: {remaining} temps left with degree >= {registers}, spilling is not supported"
    )]
    AllocationInfeasible {
        block: usize,
        remaining: usize,
        registers: usize,
    },

    #[error("Malformed {opcode} instruction: missing {slot} operand")]
    MalformedInstruction { opcode: Opcode, slot: Slot },

    #[error("Block {block} holds a `{opcode}` instruction, control flow belongs in the terminator")]
    ControlFlowInBlock { block: usize, opcode: Opcode },

    #[error("Block not found: {index}")]
    UnknownBlock { index: usize },

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
