// This module provides the compilation session that owns the state shared across all
// blocks of a compilation unit. CompilationSession holds the sequence counter that
// orders every TAC instruction in the unit (ids are handed out by one increment site and
// never reused or reset), the temp table with each temp's display name and bound
// register, and the statistics gathered while blocks are analyzed and colored. The
// session is passed by mutable reference into the passes that need it, so there is no
// process-wide counter and no interior mutability. SessionStats has a Display
// implementation that renders a short report for the tacdump binary.

//! Compilation session management.

use std::fmt;

use crate::tac::{SeqId, TempId, TempTable};

/// State shared across the blocks of one compilation unit.
#[derive(Debug)]
pub struct CompilationSession {
    /// Last sequence id handed out.
    seq: u32,

    /// Temps created for this unit.
    temps: TempTable,

    /// Session statistics.
    stats: SessionStats,
}

impl CompilationSession {
    /// Create a new compilation session.
    pub fn new() -> Self {
        Self {
            seq: 0,
            temps: TempTable::new(),
            stats: SessionStats::default(),
        }
    }

    /// Hand out the next sequence id.
    pub fn next_seq(&mut self) -> SeqId {
        self.seq += 1;
        SeqId(self.seq)
    }

    /// Create a temp with the given display name.
    pub fn new_temp(&mut self, name: impl Into<String>) -> TempId {
        self.temps.create(name)
    }

    pub fn temps(&self) -> &TempTable {
        &self.temps
    }

    pub fn temps_mut(&mut self) -> &mut TempTable {
        &mut self.temps
    }

    /// Record a block that went through def/use, liveness and DU analysis.
    pub fn record_block_analyzed(&mut self, instructions: usize) {
        self.stats.blocks_analyzed += 1;
        self.stats.instructions_analyzed += instructions;
    }

    /// Record a successful block coloring.
    pub fn record_block_colored(&mut self, temps: usize, edges: usize) {
        self.stats.blocks_colored += 1;
        self.stats.temps_colored += temps;
        self.stats.interference_edges += edges;
    }

    /// Record a block that could not be colored.
    pub fn record_allocation_failure(&mut self) {
        self.stats.allocation_failures += 1;
    }

    /// Get compilation statistics.
    pub fn stats(&self) -> SessionStats {
        self.stats.clone()
    }
}

impl Default for CompilationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Compilation session statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// Blocks analyzed.
    pub blocks_analyzed: usize,

    /// Instructions covered by block analysis.
    pub instructions_analyzed: usize,

    /// Blocks colored without error.
    pub blocks_colored: usize,

    /// Temps that received a register.
    pub temps_colored: usize,

    /// Interference edges built across all colored blocks.
    pub interference_edges: usize,

    /// Blocks whose coloring failed.
    pub allocation_failures: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Session Statistics:")?;
        writeln!(f, "  Blocks analyzed: {}", self.blocks_analyzed)?;
        writeln!(f, "  Instructions analyzed: {}", self.instructions_analyzed)?;
        writeln!(f, "  Blocks colored: {}", self.blocks_colored)?;
        writeln!(f, "  Temps colored: {}", self.temps_colored)?;
        writeln!(f, "  Interference edges: {}", self.interference_edges)?;
        if self.allocation_failures > 0 {
            writeln!(f, "  Allocation failures: {}", self.allocation_failures)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_session_creation() {
        let session = CompilationSession::new();

        let stats = session.stats();
        assert_eq!(stats.blocks_analyzed, 0);
        assert_eq!(stats.temps_colored, 0);
        assert!(session.temps().is_empty());
    }

    #[test]
    fn test_sequence_ids_increase() {
        let mut session = CompilationSession::new();
        let a = session.next_seq();
        let b = session.next_seq();
        let c = session.next_seq();
        assert!(a < b && b < c);
        assert_eq!(a, SeqId(1));
    }

    #[test]
    fn test_temp_creation() {
        let mut session = CompilationSession::new();
        let t0 = session.new_temp("t0");
        let t1 = session.new_temp("t1");
        assert_ne!(t0, t1);
        assert_eq!(session.temps().name(t1), "t1");
    }

    #[test]
    fn test_session_statistics() {
        let mut session = CompilationSession::new();
        session.record_block_analyzed(3);
        session.record_block_analyzed(2);
        session.record_block_colored(4, 3);
        session.record_allocation_failure();

        let stats = session.stats();
        assert_eq!(stats.blocks_analyzed, 2);
        assert_eq!(stats.instructions_analyzed, 5);
        assert_eq!(stats.blocks_colored, 1);
        assert_eq!(stats.temps_colored, 4);
        assert_eq!(stats.interference_edges, 3);
        assert_eq!(stats.allocation_failures, 1);
    }

    #[test]
    fn test_statistics_display() {
        let mut session = CompilationSession::new();
        session.record_block_analyzed(2);
        session.record_block_colored(3, 2);

        let output = format!("{}", session.stats());
        assert!(output.contains("Blocks analyzed: 1"));
        assert!(output.contains("Temps colored: 3"));
        assert!(!output.contains("Allocation failures"));
    }
}
