// This module implements the per-block analyzer. A BasicBlock owns its instructions as a
// vector (previous/next are indices) together with its terminator and the sets derived
// from one forward and one backward scan. The forward scan classifies every operand as a
// use or a definition through the opcode table, building the def and liveUse temp sets
// and their reference-point counterparts. The backward scan starts from the boundary
// liveOut set computed upstream by the whole-function fixed point and annotates every
// instruction with the temps live right after it. DU chains then link each definition
// point to the positions that may observe its value. Cross-block reconciliation is not
// done here: liveIn is only seeded from liveUse.

//! Basic block analysis: def/use, local liveness and DU chains.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashSet;

use super::pair::RefPoint;
use crate::core::CompilationSession;
use crate::tac::{SeqId, Tac, TempId, TempSet};

/// How control leaves a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// Unconditional transfer (or fallthrough) to `target`.
    Jump { target: usize },
    /// Go to `if_zero` when `cond` is zero, else to `otherwise`.
    BranchIfZero {
        cond: TempId,
        if_zero: usize,
        otherwise: usize,
    },
    /// Go to `if_nonzero` when `cond` is non-zero, else to `otherwise`.
    BranchIfNonZero {
        cond: TempId,
        if_nonzero: usize,
        otherwise: usize,
    },
    /// Leave the function, optionally returning `value`.
    Return { value: Option<TempId> },
}

impl Terminator {
    /// Temp read by the terminator.
    pub fn temp(&self) -> Option<TempId> {
        match self {
            Terminator::Jump { .. } => None,
            Terminator::BranchIfZero { cond, .. } | Terminator::BranchIfNonZero { cond, .. } => {
                Some(*cond)
            }
            Terminator::Return { value } => *value,
        }
    }

    pub fn successors(&self) -> Vec<usize> {
        match self {
            Terminator::Jump { target } => vec![*target],
            Terminator::BranchIfZero {
                if_zero, otherwise, ..
            } => vec![*if_zero, *otherwise],
            Terminator::BranchIfNonZero {
                if_nonzero,
                otherwise,
                ..
            } => vec![*if_nonzero, *otherwise],
            Terminator::Return { .. } => Vec::new(),
        }
    }
}

/// Finalized boundary liveness handed in by whole-function analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveOut {
    pub temps: TempSet,
    /// Reference points in successor blocks that observe values leaving this block.
    pub refs: BTreeSet<RefPoint>,
}

impl LiveOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_temps(temps: impl IntoIterator<Item = TempId>) -> Self {
        Self {
            temps: temps.into_iter().collect(),
            refs: BTreeSet::new(),
        }
    }

    pub fn with_refs(mut self, refs: impl IntoIterator<Item = RefPoint>) -> Self {
        self.refs.extend(refs);
        self
    }
}

/// A straight-line run of instructions with its analysis results.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub index: usize,
    tacs: Vec<Tac>,
    pub terminator: Terminator,
    /// Position of the terminator's read.
    end_id: SeqId,
    live_out_final: bool,

    pub def: TempSet,
    pub live_use: TempSet,
    pub live_in: TempSet,
    pub live_out: TempSet,

    pub reference: BTreeSet<RefPoint>,
    pub def_du: BTreeSet<RefPoint>,
    pub live_use_du: BTreeSet<RefPoint>,
    pub live_in_du: BTreeSet<RefPoint>,
    pub live_out_du: BTreeSet<RefPoint>,

    /// Definition point -> positions that may observe it.
    du_chain: BTreeMap<RefPoint, BTreeSet<SeqId>>,
}

impl BasicBlock {
    /// Create a block and give its instructions their sequence ids.
    pub fn new(
        index: usize,
        tacs: Vec<Tac>,
        terminator: Terminator,
        session: &mut CompilationSession,
    ) -> Self {
        let mut block = Self {
            index,
            tacs,
            terminator,
            end_id: SeqId::UNASSIGNED,
            live_out_final: false,
            def: TempSet::new(),
            live_use: TempSet::new(),
            live_in: TempSet::new(),
            live_out: TempSet::new(),
            reference: BTreeSet::new(),
            def_du: BTreeSet::new(),
            live_use_du: BTreeSet::new(),
            live_in_du: BTreeSet::new(),
            live_out_du: BTreeSet::new(),
            du_chain: BTreeMap::new(),
        };
        block.allocate_ids(session);
        block
    }

    /// Number instructions in order, then reserve the terminator's position.
    fn allocate_ids(&mut self, session: &mut CompilationSession) {
        for tac in &mut self.tacs {
            tac.id = session.next_seq();
        }
        self.end_id = session.next_seq();
    }

    pub fn tacs(&self) -> &[Tac] {
        &self.tacs
    }

    pub fn tac(&self, idx: usize) -> Option<&Tac> {
        self.tacs.get(idx)
    }

    pub fn len(&self) -> usize {
        self.tacs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tacs.is_empty()
    }

    /// Index of the instruction before `idx`.
    pub fn prev(&self, idx: usize) -> Option<usize> {
        idx.checked_sub(1).filter(|p| *p < self.tacs.len())
    }

    /// Index of the instruction after `idx`.
    pub fn next(&self, idx: usize) -> Option<usize> {
        (idx + 1 < self.tacs.len()).then_some(idx + 1)
    }

    pub fn end_id(&self) -> SeqId {
        self.end_id
    }

    pub fn successors(&self) -> Vec<usize> {
        self.terminator.successors()
    }

    /// DU chain of a definition point.
    pub fn du_chain(&self, def: &RefPoint) -> Option<&BTreeSet<SeqId>> {
        self.du_chain.get(def)
    }

    /// DU chain of the value defined by instruction `idx`.
    pub fn du_chain_at(&self, idx: usize) -> Option<&BTreeSet<SeqId>> {
        let tac = self.tacs.get(idx)?;
        let temp = tac.defined()?;
        self.du_chain.get(&RefPoint::new(tac.id, temp))
    }

    pub fn du_chains(&self) -> impl Iterator<Item = (&RefPoint, &BTreeSet<SeqId>)> {
        self.du_chain.iter()
    }

    /// Run the full per-block analysis against a finalized boundary set.
    pub fn analyze(&mut self, live_out: LiveOut) {
        self.compute_def_and_live_use();
        self.set_live_out(live_out);
        self.analyze_liveness();
        self.analyze_du_chain();
    }

    /// Forward scan classifying every operand as a use or a definition.
    pub fn compute_def_and_live_use(&mut self) {
        let mut scan = DefUseScan::default();

        for tac in &self.tacs {
            for temp in tac.uses() {
                scan.use_at(tac.id, temp);
            }
            if let Some(temp) = tac.defined() {
                scan.def_at(tac.id, temp);
            }
        }
        if let Some(temp) = self.terminator.temp() {
            scan.use_at(self.end_id, temp);
        }

        self.def = scan.def;
        self.live_use = scan.live_use;
        self.reference = scan.reference;
        self.def_du = scan.def_du;
        self.live_use_du = scan.live_use_du;
        self.live_in = self.live_use.clone();
        self.live_in_du = self.live_use_du.clone();

        log::trace!(
            "block {}: {} defs, {} live uses, {} references",
            self.index,
            self.def.len(),
            self.live_use.len(),
            self.reference.len()
        );
    }

    /// Install the boundary liveOut produced by whole-function analysis.
    pub fn set_live_out(&mut self, live_out: LiveOut) {
        self.live_out = live_out.temps;
        self.live_out_du = live_out.refs;
        self.live_out_final = true;
    }

    pub fn has_final_live_out(&self) -> bool {
        self.live_out_final
    }

    /// Backward scan annotating each instruction with the temps live after it.
    pub fn analyze_liveness(&mut self) {
        if self.tacs.is_empty() {
            return;
        }
        if !self.live_out_final {
            log::warn!(
                "block {}: liveness analyzed without a finalized liveOut",
                self.index
            );
        }

        let mut live = self.live_out.clone();
        live.extend(self.terminator.temp());

        for tac in self.tacs.iter_mut().rev() {
            let mut before = live.clone();
            if let Some(temp) = tac.defined() {
                before.remove(&temp);
            }
            before.extend(tac.live_uses());
            tac.live_out = Some(live);
            live = before;
        }
    }

    /// Link every definition point to the positions that may read its value.
    pub fn analyze_du_chain(&mut self) {
        let defs: Vec<RefPoint> = self.def_du.iter().copied().collect();
        let mut chains = BTreeMap::new();

        for (i, def) in defs.iter().enumerate() {
            let next_def = defs.get(i + 1).filter(|next| next.temp == def.temp);
            let mut chain = BTreeSet::new();
            match next_def {
                Some(next) => {
                    chain.extend(
                        self.reference
                            .range(RefPoint::span(def.temp, def.pos, next.pos))
                            .map(|p| p.pos),
                    );
                }
                None => {
                    chain.extend(
                        self.reference
                            .range(RefPoint::span(def.temp, def.pos, SeqId::MAX))
                            .map(|p| p.pos),
                    );
                    chain.extend(
                        self.live_out_du
                            .range(RefPoint::all_of(def.temp))
                            .map(|p| p.pos),
                    );
                }
            }
            chains.insert(*def, chain);
        }

        self.du_chain = chains;
    }
}

/// Accumulators of one forward scan. `seen` holds temps already read or written.
#[derive(Default)]
struct DefUseScan {
    seen: HashSet<TempId>,
    def: TempSet,
    live_use: TempSet,
    reference: BTreeSet<RefPoint>,
    def_du: BTreeSet<RefPoint>,
    live_use_du: BTreeSet<RefPoint>,
}

impl DefUseScan {
    fn use_at(&mut self, pos: SeqId, temp: TempId) {
        if self.seen.insert(temp) {
            self.live_use.insert(temp);
        }
        let point = RefPoint::new(pos, temp);
        self.reference.insert(point);
        if !self.def.contains(&temp) {
            self.live_use_du.insert(point);
        }
    }

    fn def_at(&mut self, pos: SeqId, temp: TempId) {
        self.seen.insert(temp);
        self.def.insert(temp);
        self.def_du.insert(RefPoint::new(pos, temp));
    }
}
