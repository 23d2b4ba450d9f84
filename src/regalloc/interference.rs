//! Per-block interference graph.
//!
//! Nodes are the temps a block touches, minus any temp bound to the frame
//! pointer. Two nodes interfere when both are live on entry to the block, or
//! when one is defined while the other is live right after the definition.

use std::collections::BTreeSet;

use hashbrown::{HashMap, HashSet};

use crate::core::{BackendError, BackendResult, Register, RegisterPool};
use crate::dataflow::BasicBlock;
use crate::tac::{TempId, TempTable};

/// Undirected interference graph over temps.
#[derive(Debug, Clone, Default)]
pub struct InterferenceGraph {
    /// Ordered so that simplify picks candidates deterministically.
    nodes: BTreeSet<TempId>,
    adjacency: HashMap<TempId, HashSet<TempId>>,
}

impl InterferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of an analyzed block.
    ///
    /// Branches and returns must be expressed by the terminator. A marker left
    /// in the instruction list reads a temp that liveUse never records, so the
    /// block is rejected instead of colored unsoundly.
    pub fn build(
        block: &BasicBlock,
        temps: &TempTable,
        pool: &RegisterPool,
    ) -> BackendResult<Self> {
        if let Some(tac) = block.tacs().iter().find(|tac| tac.opcode.is_control_flow()) {
            return Err(BackendError::ControlFlowInBlock {
                block: block.index,
                opcode: tac.opcode,
            });
        }

        let fp = pool.frame_pointer();
        let mut graph = Self::new();
        let add = |graph: &mut Self, temp: TempId| {
            if !is_bound_to(temps, temp, fp) {
                graph.add_node(temp);
            }
        };

        for temp in &block.live_use {
            add(&mut graph, *temp);
        }
        for tac in block.tacs() {
            for temp in tac.temps() {
                add(&mut graph, temp);
            }
        }
        if let Some(temp) = block.terminator.temp() {
            add(&mut graph, temp);
        }

        // Values live on entry are all needed at once.
        let entry: Vec<TempId> = block.live_use.iter().copied().collect();
        for (i, a) in entry.iter().enumerate() {
            for b in &entry[i + 1..] {
                graph.add_edge(*a, *b);
            }
        }

        for tac in block.tacs() {
            let (Some(def), Some(live)) = (tac.defined(), tac.live_out.as_ref()) else {
                continue;
            };
            for out in live {
                graph.add_edge(def, *out);
            }
        }

        log::trace!(
            "block {}: interference graph with {} nodes, {} edges",
            block.index,
            graph.len(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Add a node; returns false if it was already present.
    pub fn add_node(&mut self, temp: TempId) -> bool {
        if !self.nodes.insert(temp) {
            return false;
        }
        self.adjacency.entry(temp).or_default();
        true
    }

    /// Connect two distinct nodes. Edges to temps outside the graph are dropped.
    pub fn add_edge(&mut self, a: TempId, b: TempId) {
        if a == b || !self.nodes.contains(&a) || !self.nodes.contains(&b) {
            return;
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
    }

    pub fn contains(&self, temp: TempId) -> bool {
        self.nodes.contains(&temp)
    }

    /// Nodes in ascending temp order.
    pub fn nodes(&self) -> impl Iterator<Item = TempId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct neighbours.
    pub fn degree(&self, temp: TempId) -> usize {
        self.adjacency.get(&temp).map_or(0, HashSet::len)
    }

    pub fn neighbours(&self, temp: TempId) -> impl Iterator<Item = TempId> + '_ {
        self.adjacency.get(&temp).into_iter().flatten().copied()
    }

    pub fn interferes(&self, a: TempId, b: TempId) -> bool {
        self.adjacency
            .get(&a)
            .is_some_and(|set| set.contains(&b))
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(HashSet::len).sum::<usize>() / 2
    }
}

fn is_bound_to(temps: &TempTable, temp: TempId, reg: Register) -> bool {
    temps.reg(temp) == Some(reg)
}
