//! Core kernel types
//!
//! Plain data shared by every component of the core. Nothing in here
//! knows about the host.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Process identifier
///
/// Allocated monotonically starting at 1 and never reused, even after the
/// process has terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u64);

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheduling priority (recorded, not used for ordering)
pub type Priority = u8;

/// Interrupt sequence number, assigned at raise time
pub type SequenceNumber = u64;

/// A contiguous range `[start, start + length)` of the simulated address
/// space owned by one process.
///
/// A process holds a copy of this value as a reference to its block; only
/// the `MemoryManager` decides whether the range is actually allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryBlock {
    /// First address of the block
    pub start: usize,
    /// Number of addressable units
    pub length: usize,
    /// Process the block was allocated for
    pub owner: ProcessId,
}

impl MemoryBlock {
    /// One past the last address of the block
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    /// Check whether two blocks share at least one address
    pub fn overlaps(&self, other: &MemoryBlock) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// A contiguous free range between allocations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeGap {
    pub start: usize,
    pub length: usize,
}

/// Snapshot of address space usage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStatus {
    /// Size of the address space
    pub total: usize,
    /// Sum of all allocated block lengths
    pub used: usize,
    /// `total - used`
    pub free: usize,
    /// Number of disjoint free gaps
    pub free_gaps: usize,
    /// Length of the largest free gap (largest satisfiable request)
    pub largest_free_gap: usize,
    /// Number of live allocations
    pub allocations: usize,
}

impl MemoryStatus {
    /// Free space that cannot be used by a single maximal allocation.
    pub fn fragmented_bytes(&self) -> usize {
        self.free - self.largest_free_gap
    }

    /// True when the free space is split into more than one gap
    pub fn is_fragmented(&self) -> bool {
        self.free_gaps > 1
    }
}
