//! Simplify/select coloring.
//!
//! Simplify repeatedly removes the lowest-numbered node whose remaining
//! degree is below K and pushes it on a stack. Select pops the stack and gives
//! each node the first pool register not held by an already colored
//! neighbour. A graph with no removable node left is rejected: there is no
//! spilling.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;

use super::interference::InterferenceGraph;
use crate::core::{BackendError, BackendResult, RegBitSet, Register, RegisterPool};
use crate::tac::{TempId, TempTable};

/// Registers chosen for the temps of one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coloring {
    block: usize,
    assignment: BTreeMap<TempId, Register>,
}

impl Coloring {
    pub fn block(&self) -> usize {
        self.block
    }

    pub fn get(&self, temp: TempId) -> Option<Register> {
        self.assignment.get(&temp).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TempId, Register)> + '_ {
        self.assignment.iter().map(|(t, r)| (*t, *r))
    }

    pub fn len(&self) -> usize {
        self.assignment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignment.is_empty()
    }

    /// Write the chosen registers onto the temps.
    pub fn apply(&self, temps: &mut TempTable) {
        for (temp, reg) in self.iter() {
            temps.bind(temp, reg);
        }
    }
}

/// Kempe-style colorer for one interference graph.
pub struct KempeColorer<'a> {
    graph: &'a InterferenceGraph,
    pool: &'a RegisterPool,
}

impl<'a> KempeColorer<'a> {
    pub fn new(graph: &'a InterferenceGraph, pool: &'a RegisterPool) -> Self {
        Self { graph, pool }
    }

    /// Color every node of the graph, or fail if simplify gets stuck.
    pub fn color(&self, block: usize) -> BackendResult<Coloring> {
        let stack = self.simplify(block)?;
        self.select(block, stack)
    }

    fn simplify(&self, block: usize) -> BackendResult<Vec<TempId>> {
        let k = self.pool.len();
        let mut remaining: BTreeSet<TempId> = self.graph.nodes().collect();
        let mut degree: HashMap<TempId, usize> = remaining
            .iter()
            .map(|t| (*t, self.graph.degree(*t)))
            .collect();
        let mut stack = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let Some(node) = remaining
                .iter()
                .copied()
                .find(|t| degree.get(t).copied().unwrap_or(0) < k)
            else {
                log::debug!(
                    "block {}: simplify stuck with {} temps and {} registers",
                    block,
                    remaining.len(),
                    k
                );
                return Err(BackendError::AllocationInfeasible {
                    block,
                    remaining: remaining.len(),
                    registers: k,
                });
            };

            remaining.remove(&node);
            for neighbour in self.graph.neighbours(node) {
                if remaining.contains(&neighbour) {
                    if let Some(d) = degree.get_mut(&neighbour) {
                        *d = d.saturating_sub(1);
                    }
                }
            }
            stack.push(node);
        }

        Ok(stack)
    }

    fn select(&self, block: usize, mut stack: Vec<TempId>) -> BackendResult<Coloring> {
        let mut assignment = BTreeMap::new();

        while let Some(node) = stack.pop() {
            let mut used = RegBitSet::new();
            for neighbour in self.graph.neighbours(node) {
                if let Some(slot) = assignment
                    .get(&neighbour)
                    .and_then(|reg| self.pool.slot_of(*reg))
                {
                    used.set(slot);
                }
            }
            // Simplify removed the node with fewer than K live neighbours.
            let reg = self.pool.first_available(&used).ok_or(
                BackendError::AllocationInfeasible {
                    block,
                    remaining: stack.len() + 1,
                    registers: self.pool.len(),
                },
            )?;
            log::trace!("block {}: {} -> {}", block, node, reg);
            assignment.insert(node, reg);
        }

        Ok(Coloring { block, assignment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_graph(n: u32) -> InterferenceGraph {
        let mut graph = InterferenceGraph::new();
        for i in 0..n {
            graph.add_node(TempId(i));
        }
        for i in 0..n {
            for j in i + 1..n {
                graph.add_edge(TempId(i), TempId(j));
            }
        }
        graph
    }

    fn assert_sound(graph: &InterferenceGraph, coloring: &Coloring) {
        for node in graph.nodes() {
            let reg = coloring.get(node).expect("every node is colored");
            for neighbour in graph.neighbours(node) {
                assert_ne!(Some(reg), coloring.get(neighbour));
            }
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = InterferenceGraph::new();
        let pool = RegisterPool::mips_with(0);
        let coloring = KempeColorer::new(&graph, &pool).color(0).unwrap();
        assert!(coloring.is_empty());
    }

    #[test]
    fn test_clique_of_k_is_colorable() {
        let graph = complete_graph(3);
        let pool = RegisterPool::mips_with(3);
        let coloring = KempeColorer::new(&graph, &pool).color(0).unwrap();
        assert_eq!(coloring.len(), 3);
        assert_sound(&graph, &coloring);
    }

    #[test]
    fn test_clique_larger_than_k_fails() {
        let graph = complete_graph(4);
        let pool = RegisterPool::mips_with(3);
        let err = KempeColorer::new(&graph, &pool).color(5).unwrap_err();
        assert_eq!(
            err,
            BackendError::AllocationInfeasible {
                block: 5,
                remaining: 4,
                registers: 3
            }
        );
    }

    #[test]
    fn test_isolated_nodes_get_first_register() {
        let mut graph = InterferenceGraph::new();
        graph.add_node(TempId(0));
        graph.add_node(TempId(1));
        let pool = RegisterPool::mips();
        let coloring = KempeColorer::new(&graph, &pool).color(0).unwrap();
        let first = pool.registers()[0];
        assert_eq!(coloring.get(TempId(0)), Some(first));
        assert_eq!(coloring.get(TempId(1)), Some(first));
    }

    #[test]
    fn test_coloring_is_deterministic() {
        let graph = complete_graph(5);
        let pool = RegisterPool::mips();
        let a = KempeColorer::new(&graph, &pool).color(0).unwrap();
        let b = KempeColorer::new(&graph, &pool).color(0).unwrap();
        assert_eq!(a, b);
        // last simplified node is selected first and takes the first register
        assert_eq!(a.get(TempId(4)), Some(pool.registers()[0]));
    }

    #[test]
    fn test_apply_binds_temps() {
        let mut table = TempTable::new();
        let x = table.create("x");
        let graph = {
            let mut g = InterferenceGraph::new();
            g.add_node(x);
            g
        };
        let pool = RegisterPool::mips();
        let coloring = KempeColorer::new(&graph, &pool).color(0).unwrap();
        coloring.apply(&mut table);
        assert_eq!(table.reg(x), Some(pool.registers()[0]));
    }
}
