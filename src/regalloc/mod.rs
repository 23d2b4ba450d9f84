// This module implements register allocation for one analyzed basic block. The
// allocator builds an interference graph from the block's liveUse set and the
// per-instruction liveOut annotations left by liveness analysis, colors it with the
// registers of the configured pool using simplify/select, and binds the chosen
// registers onto the temps in the session's temp table. Allocation is local to a block:
// a temp that appears in several blocks is colored once per block and keeps the binding
// of the last block processed, so callers that need the per-block view keep the returned
// Coloring. Blocks that would need spilling are rejected with AllocationInfeasible, and
// blocks still holding a branch or return instruction with ControlFlowInBlock.

//! Per-block graph-coloring register allocation.

pub mod coloring;
pub mod interference;

pub use coloring::{Coloring, KempeColorer};
pub use interference::InterferenceGraph;

use crate::core::{BackendResult, CompilationSession, RegisterPool};
use crate::dataflow::BasicBlock;

/// Colors analyzed blocks with a fixed register pool.
#[derive(Debug, Clone, Default)]
pub struct RegisterAllocator {
    pool: RegisterPool,
}

impl RegisterAllocator {
    pub fn new(pool: RegisterPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &RegisterPool {
        &self.pool
    }

    /// Allocate registers for one block and bind them onto its temps.
    ///
    /// The block must already carry its liveUse set and per-instruction
    /// liveOut annotations.
    pub fn allocate(
        &self,
        block: &BasicBlock,
        session: &mut CompilationSession,
    ) -> BackendResult<Coloring> {
        let colored = InterferenceGraph::build(block, session.temps(), &self.pool).and_then(
            |graph| {
                let coloring = KempeColorer::new(&graph, &self.pool).color(block.index)?;
                Ok((graph, coloring))
            },
        );
        let (graph, coloring) = match colored {
            Ok(colored) => colored,
            Err(err) => {
                session.record_allocation_failure();
                return Err(err);
            }
        };

        coloring.apply(session.temps_mut());
        session.record_block_colored(coloring.len(), graph.edge_count());
        log::debug!(
            "block {}: colored {} temps with {} registers",
            block.index,
            coloring.len(),
            self.pool.len()
        );
        Ok(coloring)
    }
}
