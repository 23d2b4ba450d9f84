//! TAC instructions.

use std::fmt;

use super::opcode::{Opcode, Slot};
use super::temp::{TempId, TempSet, TempTable};
use crate::core::{BackendError, BackendResult};

/// Position of an instruction in the compilation unit.
///
/// Ids come from the session counter; ordering by id is program order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeqId(pub u32);

impl SeqId {
    /// Placeholder held by an instruction not yet placed in a block.
    pub const UNASSIGNED: SeqId = SeqId(0);
    pub const MAX: SeqId = SeqId(u32::MAX);

    pub fn succ(self) -> SeqId {
        SeqId(self.0.saturating_add(1))
    }
}

impl fmt::Display for SeqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One three-address instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Tac {
    pub opcode: Opcode,
    pub op0: Option<TempId>,
    pub op1: Option<TempId>,
    pub op2: Option<TempId>,
    /// Immediate value or memory offset.
    pub imm: Option<i32>,
    /// Call target, class name, string literal, label or memo text.
    pub label: Option<String>,
    pub id: SeqId,
    /// Temps live right after this instruction, set by liveness analysis.
    pub live_out: Option<TempSet>,
}

impl Tac {
    /// Build an instruction, rejecting absent required slots.
    pub fn new(
        opcode: Opcode,
        op0: Option<TempId>,
        op1: Option<TempId>,
        op2: Option<TempId>,
    ) -> BackendResult<Self> {
        let tac = Self {
            opcode,
            op0,
            op1,
            op2,
            imm: None,
            label: None,
            id: SeqId::UNASSIGNED,
            live_out: None,
        };
        if let Some(slot) = opcode
            .info()
            .required
            .iter()
            .copied()
            .find(|slot| tac.operand(*slot).is_none())
        {
            return Err(BackendError::MalformedInstruction { opcode, slot });
        }
        Ok(tac)
    }

    pub fn with_imm(mut self, imm: i32) -> Self {
        self.imm = Some(imm);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn binary(opcode: Opcode, dst: TempId, lhs: TempId, rhs: TempId) -> BackendResult<Self> {
        Self::new(opcode, Some(dst), Some(lhs), Some(rhs))
    }

    pub fn unary(opcode: Opcode, dst: TempId, src: TempId) -> BackendResult<Self> {
        Self::new(opcode, Some(dst), Some(src), None)
    }

    pub fn assign(dst: TempId, src: TempId) -> BackendResult<Self> {
        Self::unary(Opcode::Assign, dst, src)
    }

    pub fn load_imm(dst: TempId, value: i32) -> BackendResult<Self> {
        Ok(Self::new(Opcode::LoadImm4, Some(dst), None, None)?.with_imm(value))
    }

    pub fn load_str(dst: TempId, value: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::new(Opcode::LoadStrConst, Some(dst), None, None)?.with_label(value))
    }

    pub fn load_vtbl(dst: TempId, class: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::new(Opcode::LoadVtbl, Some(dst), None, None)?.with_label(class))
    }

    /// `dst = *(base + offset)`
    pub fn load(dst: TempId, base: TempId, offset: i32) -> BackendResult<Self> {
        Ok(Self::unary(Opcode::Load, dst, base)?.with_imm(offset))
    }

    /// `*(base + offset) = src`
    pub fn store(src: TempId, base: TempId, offset: i32) -> BackendResult<Self> {
        Ok(Self::new(Opcode::Store, Some(src), Some(base), None)?.with_imm(offset))
    }

    pub fn direct_call(dst: Option<TempId>, target: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::new(Opcode::DirectCall, dst, None, None)?.with_label(target))
    }

    pub fn indirect_call(dst: Option<TempId>, func: TempId) -> BackendResult<Self> {
        Self::new(Opcode::IndirectCall, dst, Some(func), None)
    }

    pub fn parm(src: TempId) -> BackendResult<Self> {
        Self::new(Opcode::Parm, Some(src), None, None)
    }

    pub fn ret(value: Option<TempId>) -> BackendResult<Self> {
        Self::new(Opcode::Return, value, None, None)
    }

    pub fn branch(label: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::new(Opcode::Branch, None, None, None)?.with_label(label))
    }

    pub fn beqz(cond: TempId, label: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::new(Opcode::Beqz, Some(cond), None, None)?.with_label(label))
    }

    pub fn bnez(cond: TempId, label: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::new(Opcode::Bnez, Some(cond), None, None)?.with_label(label))
    }

    pub fn mark(label: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::new(Opcode::Mark, None, None, None)?.with_label(label))
    }

    pub fn memo(text: impl Into<String>) -> BackendResult<Self> {
        Ok(Self::new(Opcode::Memo, None, None, None)?.with_label(text))
    }

    pub fn operand(&self, slot: Slot) -> Option<TempId> {
        match slot {
            Slot::Op0 => self.op0,
            Slot::Op1 => self.op1,
            Slot::Op2 => self.op2,
        }
    }

    /// Temp written by this instruction.
    pub fn defined(&self) -> Option<TempId> {
        self.opcode.info().def.and_then(|slot| self.operand(slot))
    }

    /// Temps read by this instruction, in slot order.
    pub fn uses(&self) -> impl Iterator<Item = TempId> + '_ {
        self.opcode
            .info()
            .uses
            .iter()
            .filter_map(move |slot| self.operand(*slot))
    }

    /// Reads seen by backward liveness, including a branch marker's condition.
    pub fn live_uses(&self) -> impl Iterator<Item = TempId> + '_ {
        let cond = self.opcode.info().cond.and_then(|slot| self.operand(slot));
        self.uses().chain(cond)
    }

    /// Every temp named by the instruction.
    pub fn temps(&self) -> impl Iterator<Item = TempId> + '_ {
        [self.op0, self.op1, self.op2].into_iter().flatten()
    }

    /// Render the instruction with temp display names.
    pub fn display<'a>(&'a self, temps: &'a TempTable) -> TacDisplay<'a> {
        TacDisplay { tac: self, temps }
    }
}

/// Display adapter that resolves temp names.
pub struct TacDisplay<'a> {
    tac: &'a Tac,
    temps: &'a TempTable,
}

impl TacDisplay<'_> {
    fn name(&self, temp: Option<TempId>) -> String {
        temp.map(|t| self.temps.name(t)).unwrap_or_default()
    }
}

impl fmt::Display for TacDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Opcode::*;
        let tac = self.tac;
        let label = tac.label.as_deref().unwrap_or("");
        let imm = tac.imm.unwrap_or(0);
        let op0 = self.name(tac.op0);
        let op1 = self.name(tac.op1);
        let op2 = self.name(tac.op2);
        match tac.opcode {
            Neg | LNot => {
                let sym = tac.opcode.symbol().unwrap_or("?");
                write!(f, "{} = {} {}", op0, sym, op1)
            }
            op if op.is_binary() => {
                let sym = op.symbol().unwrap_or("?");
                write!(f, "{} = ({} {} {})", op0, op1, sym, op2)
            }
            Assign => write!(f, "{} = {}", op0, op1),
            Load => write!(f, "{} = *({} {:+})", op0, op1, imm),
            Store => write!(f, "*({} {:+}) = {}", op1, imm, op0),
            IndirectCall | DirectCall => {
                if tac.op0.is_some() {
                    write!(f, "{} = ", op0)?;
                }
                if tac.opcode == IndirectCall {
                    write!(f, "call {}", op1)
                } else {
                    write!(f, "call {}", label)
                }
            }
            Return => match tac.op0 {
                Some(_) => write!(f, "return {}", op0),
                None => write!(f, "return <empty>"),
            },
            LoadImm4 => write!(f, "{} = {}", op0, imm),
            LoadStrConst => write!(f, "{} = {:?}", op0, label),
            LoadVtbl => write!(f, "{} = VTBL <{}>", op0, label),
            Parm => write!(f, "parm {}", op0),
            Branch => write!(f, "branch {}", label),
            Beqz => write!(f, "if ({} == 0) branch {}", op0, label),
            Bnez => write!(f, "if ({} != 0) branch {}", op0, label),
            Mark => write!(f, "{}:", label),
            Memo => write!(f, "memo '{}'", label),
            _ => write!(f, "{}", tac.opcode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temps(n: usize) -> (TempTable, Vec<TempId>) {
        let mut table = TempTable::new();
        let ids = (0..n).map(|i| table.create(format!("t{i}"))).collect();
        (table, ids)
    }

    #[test]
    fn test_binary_def_and_uses() {
        let (_, t) = temps(3);
        let tac = Tac::binary(Opcode::Add, t[0], t[1], t[2]).unwrap();
        assert_eq!(tac.defined(), Some(t[0]));
        assert_eq!(tac.uses().collect::<Vec<_>>(), vec![t[1], t[2]]);
    }

    #[test]
    fn test_missing_required_slot_is_malformed() {
        let (_, t) = temps(2);
        let err = Tac::new(Opcode::Add, Some(t[0]), Some(t[1]), None).unwrap_err();
        assert_eq!(
            err,
            BackendError::MalformedInstruction {
                opcode: Opcode::Add,
                slot: Slot::Op2
            }
        );
        assert!(Tac::new(Opcode::IndirectCall, Some(t[0]), None, None).is_err());
        assert!(Tac::new(Opcode::Parm, None, None, None).is_err());
    }

    #[test]
    fn test_void_calls_define_nothing() {
        let (_, t) = temps(1);
        let call = Tac::direct_call(None, "_Main_print").unwrap();
        assert_eq!(call.defined(), None);
        let icall = Tac::indirect_call(None, t[0]).unwrap();
        assert_eq!(icall.defined(), None);
        assert_eq!(icall.uses().collect::<Vec<_>>(), vec![t[0]]);
    }

    #[test]
    fn test_store_reads_both_operands() {
        let (_, t) = temps(2);
        let store = Tac::store(t[0], t[1], 4).unwrap();
        assert_eq!(store.defined(), None);
        assert_eq!(store.uses().collect::<Vec<_>>(), vec![t[0], t[1]]);
    }

    #[test]
    fn test_condition_only_in_live_uses() {
        let (_, t) = temps(1);
        let br = Tac::beqz(t[0], "_L1").unwrap();
        assert_eq!(br.uses().count(), 0);
        assert_eq!(br.live_uses().collect::<Vec<_>>(), vec![t[0]]);
    }

    #[test]
    fn test_display() {
        let (table, t) = temps(3);
        let add = Tac::binary(Opcode::Add, t[0], t[1], t[2]).unwrap();
        assert_eq!(add.display(&table).to_string(), "t0 = (t1 + t2)");
        let load = Tac::load(t[0], t[1], -4).unwrap();
        assert_eq!(load.display(&table).to_string(), "t0 = *(t1 -4)");
        let store = Tac::store(t[0], t[1], 8).unwrap();
        assert_eq!(store.display(&table).to_string(), "*(t1 +8) = t0");
        let neg = Tac::unary(Opcode::Neg, t[0], t[1]).unwrap();
        assert_eq!(neg.display(&table).to_string(), "t0 = - t1");
        let ret = Tac::ret(None).unwrap();
        assert_eq!(ret.display(&table).to_string(), "return <empty>");
    }
}
