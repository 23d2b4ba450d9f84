//! Block pipeline.
//!
//! Drives the blocks of one function through def/use, liveness, DU chains
//! and register allocation in block order. Boundary liveOut sets come from
//! whole-function analysis and are passed in per block. Processing stops at
//! the first fatal error.

use crate::core::{BackendError, BackendResult, CompilationSession, RegisterPool};
use crate::dataflow::{BasicBlock, LiveOut};
use crate::regalloc::{Coloring, RegisterAllocator};

/// Analysis and allocation over the blocks of one function.
#[derive(Debug, Clone, Default)]
pub struct BlockPipeline {
    allocator: RegisterAllocator,
}

impl BlockPipeline {
    pub fn new(pool: RegisterPool) -> Self {
        Self {
            allocator: RegisterAllocator::new(pool),
        }
    }

    pub fn pool(&self) -> &RegisterPool {
        self.allocator.pool()
    }

    /// Analyze then allocate every block.
    pub fn run(
        &self,
        session: &mut CompilationSession,
        blocks: &mut [BasicBlock],
        live_outs: &[LiveOut],
    ) -> BackendResult<Vec<Coloring>> {
        self.analyze(session, blocks, live_outs)?;
        self.allocate(session, blocks)
    }

    /// Def/use, liveness and DU chains for every block.
    ///
    /// `live_outs[i]` is the boundary set of block `i`; a missing entry is
    /// treated as empty.
    pub fn analyze(
        &self,
        session: &mut CompilationSession,
        blocks: &mut [BasicBlock],
        live_outs: &[LiveOut],
    ) -> BackendResult<()> {
        check_successors(blocks)?;

        for (i, block) in blocks.iter_mut().enumerate() {
            let live_out = match live_outs.get(i) {
                Some(live_out) => live_out.clone(),
                None => {
                    log::warn!("block {}: no liveOut given, assuming empty", block.index);
                    LiveOut::new()
                }
            };
            block.analyze(live_out);
            session.record_block_analyzed(block.len());
            log::debug!(
                "block {}: analyzed {} instructions, {} live on entry",
                block.index,
                block.len(),
                block.live_in.len()
            );
        }
        Ok(())
    }

    /// Color every analyzed block; one `Coloring` per block, in order.
    pub fn allocate(
        &self,
        session: &mut CompilationSession,
        blocks: &[BasicBlock],
    ) -> BackendResult<Vec<Coloring>> {
        blocks
            .iter()
            .map(|block| self.allocator.allocate(block, session))
            .collect()
    }
}

fn check_successors(blocks: &[BasicBlock]) -> BackendResult<()> {
    for block in blocks {
        if let Some(index) = block.successors().into_iter().find(|s| *s >= blocks.len()) {
            return Err(BackendError::UnknownBlock { index });
        }
    }
    Ok(())
}
