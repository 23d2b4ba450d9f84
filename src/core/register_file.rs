//! Physical registers and the allocatable pool.
//!
//! The allocator colors temps with registers drawn from a [`RegisterPool`]:
//! an ordered list of allocatable registers plus one frame-pointer register
//! that is never handed out. The pool order is the selection order, which
//! keeps allocation output reproducible. [`RegBitSet`] tracks which pool
//! slots are taken by already-colored neighbours during selection.

use std::fmt;

/// Maximum number of registers in one pool.
pub const MAX_POOL_REGISTERS: usize = 64;

/// Type for register IDs.
pub type RegId = u8;

/// A physical machine register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register {
    pub id: RegId,
    pub name: &'static str,
}

impl Register {
    pub const fn new(id: RegId, name: &'static str) -> Self {
        Self { id, name }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// MIPS general purpose registers usable for temps, in selection order.
const MIPS_ALLOCATABLE: [Register; 18] = [
    Register::new(8, "$t0"),
    Register::new(9, "$t1"),
    Register::new(10, "$t2"),
    Register::new(11, "$t3"),
    Register::new(12, "$t4"),
    Register::new(13, "$t5"),
    Register::new(14, "$t6"),
    Register::new(15, "$t7"),
    Register::new(16, "$s0"),
    Register::new(17, "$s1"),
    Register::new(18, "$s2"),
    Register::new(19, "$s3"),
    Register::new(20, "$s4"),
    Register::new(21, "$s5"),
    Register::new(22, "$s6"),
    Register::new(23, "$s7"),
    Register::new(24, "$t8"),
    Register::new(25, "$t9"),
];

/// MIPS frame pointer.
pub const MIPS_FP: Register = Register::new(30, "$fp");

/// Bit set over pool slot indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegBitSet {
    bits: u64,
}

impl RegBitSet {
    /// Create empty register set.
    pub fn new() -> Self {
        Self { bits: 0 }
    }

    /// Check if slot is set.
    pub fn contains(&self, slot: usize) -> bool {
        slot < MAX_POOL_REGISTERS && (self.bits & (1u64 << slot)) != 0
    }

    /// Set a slot.
    pub fn set(&mut self, slot: usize) {
        if slot < MAX_POOL_REGISTERS {
            self.bits |= 1u64 << slot;
        }
    }

    /// Clear a slot.
    pub fn clear(&mut self, slot: usize) {
        if slot < MAX_POOL_REGISTERS {
            self.bits &= !(1u64 << slot);
        }
    }

    /// First slot below `limit` that is not set.
    pub fn first_free(&self, limit: usize) -> Option<usize> {
        let limit = limit.min(MAX_POOL_REGISTERS);
        let free = !self.bits;
        if free == 0 {
            return None;
        }
        let slot = free.trailing_zeros() as usize;
        (slot < limit).then_some(slot)
    }

    /// Number of set slots.
    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

/// The fixed register pool handed to the allocator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPool {
    allocatable: Vec<Register>,
    frame_pointer: Register,
}

impl RegisterPool {
    /// Create a pool from an ordered list of registers and the frame pointer.
    ///
    /// The frame pointer is removed from the allocatable list if present.
    pub fn new(registers: &[Register], frame_pointer: Register) -> Self {
        let allocatable: Vec<Register> = registers
            .iter()
            .copied()
            .filter(|reg| *reg != frame_pointer)
            .collect();
        assert!(
            allocatable.len() <= MAX_POOL_REGISTERS,
            "Too many registers in pool"
        );
        Self {
            allocatable,
            frame_pointer,
        }
    }

    /// The full MIPS temp pool.
    pub fn mips() -> Self {
        Self::new(&MIPS_ALLOCATABLE, MIPS_FP)
    }

    /// The first `count` MIPS registers.
    pub fn mips_with(count: usize) -> Self {
        let count = count.min(MIPS_ALLOCATABLE.len());
        Self::new(&MIPS_ALLOCATABLE[..count], MIPS_FP)
    }

    /// Number of usable colors (K).
    pub fn len(&self) -> usize {
        self.allocatable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocatable.is_empty()
    }

    pub fn registers(&self) -> &[Register] {
        &self.allocatable
    }

    pub fn frame_pointer(&self) -> Register {
        self.frame_pointer
    }

    /// Pool slot of a register, if it is allocatable.
    pub fn slot_of(&self, reg: Register) -> Option<usize> {
        self.allocatable.iter().position(|r| *r == reg)
    }

    /// Lowest-ordered register whose slot is not in `used`.
    pub fn first_available(&self, used: &RegBitSet) -> Option<Register> {
        used.first_free(self.allocatable.len())
            .map(|slot| self.allocatable[slot])
    }
}

impl Default for RegisterPool {
    fn default() -> Self {
        Self::mips()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regbitset_operations() {
        let mut set = RegBitSet::new();
        assert!(set.is_empty());
        set.set(0);
        set.set(2);
        assert!(set.contains(0));
        assert!(!set.contains(1));
        assert_eq!(set.first_free(8), Some(1));
        set.set(1);
        assert_eq!(set.first_free(8), Some(3));
        assert_eq!(set.first_free(3), None);
        set.clear(0);
        assert_eq!(set.first_free(3), Some(0));
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn test_pool_excludes_frame_pointer() {
        let regs = [
            Register::new(1, "r1"),
            Register::new(2, "fp"),
            Register::new(3, "r3"),
        ];
        let pool = RegisterPool::new(&regs, Register::new(2, "fp"));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.slot_of(Register::new(2, "fp")), None);
        assert_eq!(pool.slot_of(Register::new(3, "r3")), Some(1));
    }

    #[test]
    fn test_first_available_follows_pool_order() {
        let pool = RegisterPool::mips_with(3);
        let mut used = RegBitSet::new();
        assert_eq!(pool.first_available(&used).map(|r| r.name), Some("$t0"));
        used.set(0);
        assert_eq!(pool.first_available(&used).map(|r| r.name), Some("$t1"));
        used.set(1);
        used.set(2);
        assert_eq!(pool.first_available(&used), None);
    }

    #[test]
    fn test_mips_pool() {
        let pool = RegisterPool::mips();
        assert_eq!(pool.len(), 18);
        assert_eq!(pool.frame_pointer(), MIPS_FP);
        assert_eq!(RegisterPool::mips_with(100).len(), 18);
    }
}
