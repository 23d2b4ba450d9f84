//! Instruction and operand model.
//!
//! Three-address code as handed over by the lowering pass: temps, opcodes
//! with their operand-role table, and instructions carrying a sequence id
//! and, after liveness analysis, a liveOut annotation. [`parse_listing`]
//! reads blocks from a small text format.

pub mod instr;
pub mod opcode;
pub mod parser;
pub mod temp;

pub use instr::{SeqId, Tac, TacDisplay};
pub use opcode::{OpInfo, Opcode, Slot};
pub use parser::{parse_listing, Listing};
pub use temp::{Temp, TempId, TempSet, TempTable};
