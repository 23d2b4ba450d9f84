//! TAC opcodes and their operand-role table.
//!
//! Every opcode has a fixed [`OpInfo`] entry saying which operand slots it
//! reads, which slot it writes, and which slots must be present. The block
//! analyzer, the liveness pass and the interference builder all classify
//! operands through this one table.

use std::fmt;

/// An operand slot of a TAC instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Op0,
    Op1,
    Op2,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Op0 => "op0",
            Slot::Op1 => "op1",
            Slot::Op2 => "op2",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LAnd,
    LOr,
    Gtr,
    Geq,
    Equ,
    Neq,
    Leq,
    Les,
    Neg,
    LNot,
    Assign,
    Load,
    IndirectCall,
    DirectCall,
    Return,
    LoadImm4,
    LoadStrConst,
    LoadVtbl,
    Store,
    Parm,
    Branch,
    Beqz,
    Bnez,
    Mark,
    Memo,
}

/// Operand roles of one opcode.
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub name: &'static str,
    /// Slots read by the instruction.
    pub uses: &'static [Slot],
    /// Slot written by the instruction, when present.
    pub def: Option<Slot>,
    /// Slots that must hold a temp.
    pub required: &'static [Slot],
    /// Condition slot of a branch marker, read only by backward liveness.
    pub cond: Option<Slot>,
}

const BINARY: &[Slot] = &[Slot::Op1, Slot::Op2];
const BINARY_REQUIRED: &[Slot] = &[Slot::Op0, Slot::Op1, Slot::Op2];
const UNARY: &[Slot] = &[Slot::Op1];
const UNARY_REQUIRED: &[Slot] = &[Slot::Op0, Slot::Op1];
const STORE: &[Slot] = &[Slot::Op0, Slot::Op1];
const OP0: &[Slot] = &[Slot::Op0];
const OP1: &[Slot] = &[Slot::Op1];
const NONE: &[Slot] = &[];

const fn binary(name: &'static str) -> OpInfo {
    OpInfo { name, uses: BINARY, def: Some(Slot::Op0), required: BINARY_REQUIRED, cond: None }
}

const fn unary(name: &'static str) -> OpInfo {
    OpInfo { name, uses: UNARY, def: Some(Slot::Op0), required: UNARY_REQUIRED, cond: None }
}

const fn load_const(name: &'static str) -> OpInfo {
    OpInfo { name, uses: NONE, def: Some(Slot::Op0), required: OP0, cond: None }
}

const fn marker(name: &'static str) -> OpInfo {
    OpInfo { name, uses: NONE, def: None, required: NONE, cond: None }
}

impl Opcode {
    pub const fn info(self) -> OpInfo {
        use Opcode::*;
        match self {
            Add => binary("add"),
            Sub => binary("sub"),
            Mul => binary("mul"),
            Div => binary("div"),
            Mod => binary("mod"),
            LAnd => binary("and"),
            LOr => binary("or"),
            Gtr => binary("gt"),
            Geq => binary("ge"),
            Equ => binary("eq"),
            Neq => binary("ne"),
            Leq => binary("le"),
            Les => binary("lt"),
            Neg => unary("neg"),
            LNot => unary("not"),
            Assign => unary("mov"),
            Load => unary("load"),
            // A void call leaves op0 empty.
            IndirectCall => OpInfo { name: "icall", uses: UNARY, def: Some(Slot::Op0), required: OP1, cond: None },
            DirectCall => OpInfo { name: "call", uses: NONE, def: Some(Slot::Op0), required: NONE, cond: None },
            Return => OpInfo { name: "ret", uses: NONE, def: Some(Slot::Op0), required: NONE, cond: None },
            LoadImm4 => load_const("imm"),
            LoadStrConst => load_const("str"),
            LoadVtbl => load_const("vtbl"),
            Store => OpInfo { name: "store", uses: STORE, def: None, required: STORE, cond: None },
            Parm => OpInfo { name: "parm", uses: OP0, def: None, required: OP0, cond: None },
            Branch => marker("branch"),
            Beqz => OpInfo { name: "beqz", uses: NONE, def: None, required: OP0, cond: Some(Slot::Op0) },
            Bnez => OpInfo { name: "bnez", uses: NONE, def: None, required: OP0, cond: Some(Slot::Op0) },
            Mark => marker("mark"),
            Memo => marker("memo"),
        }
    }

    /// Source-level operator of binary and unary opcodes.
    pub const fn symbol(self) -> Option<&'static str> {
        use Opcode::*;
        match self {
            Add => Some("+"),
            Sub => Some("-"),
            Mul => Some("*"),
            Div => Some("/"),
            Mod => Some("%"),
            LAnd => Some("&&"),
            LOr => Some("||"),
            Gtr => Some(">"),
            Geq => Some(">="),
            Equ => Some("=="),
            Neq => Some("!="),
            Leq => Some("<="),
            Les => Some("<"),
            Neg => Some("-"),
            LNot => Some("!"),
            _ => None,
        }
    }

    /// Opcodes that end a block; inside an instruction list they are markers only.
    pub fn is_control_flow(self) -> bool {
        matches!(self, Opcode::Branch | Opcode::Beqz | Opcode::Bnez | Opcode::Return)
    }

    pub fn is_binary(self) -> bool {
        self.info().uses.len() == 2 && self.info().def.is_some()
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        use Opcode::*;
        const ALL: [Opcode; 30] = [
            Add, Sub, Mul, Div, Mod, LAnd, LOr, Gtr, Geq, Equ, Neq, Leq, Les, Neg, LNot, Assign,
            Load, IndirectCall, DirectCall, Return, LoadImm4, LoadStrConst, LoadVtbl, Store, Parm,
            Branch, Beqz, Bnez, Mark, Memo,
        ];
        ALL.into_iter().find(|op| op.info().name == s)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.info().name)
    }
}
