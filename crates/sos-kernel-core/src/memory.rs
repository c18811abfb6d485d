//! Simulated physical memory
//!
//! The `MemoryManager` owns a fixed address space and the list of allocated
//! blocks. Free space is never stored: it is the complement of the
//! allocation list, so freeing a block coalesces it with its neighbours by
//! construction.
//!
//! # Policy
//!
//! First-fit over the free gaps in ascending address order. A request
//! either gets one contiguous gap or fails; nothing is partially allocated.

use alloc::vec;
use alloc::vec::Vec;
use core::slice;

use crate::error::KernelError;
use crate::types::{FreeGap, MemoryBlock, MemoryStatus, ProcessId};

/// Fixed-size address space with first-fit allocation.
pub struct MemoryManager {
    /// Size of the address space
    total_size: usize,
    /// Allocated blocks, sorted by `start`, pairwise disjoint
    allocated: Vec<MemoryBlock>,
    /// Backing bytes for block contents
    backing: Vec<u8>,
}

impl MemoryManager {
    /// Create an empty address space of `total_size` units.
    pub fn new(total_size: usize) -> Self {
        Self {
            total_size,
            allocated: Vec::new(),
            backing: vec![0; total_size],
        }
    }

    /// Size of the address space
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Sum of all allocated lengths
    pub fn used(&self) -> usize {
        self.allocated.iter().map(|b| b.length).sum()
    }

    /// Unallocated space (possibly fragmented)
    pub fn free_space(&self) -> usize {
        self.total_size - self.used()
    }

    /// Allocated blocks in address order
    pub fn blocks(&self) -> &[MemoryBlock] {
        &self.allocated
    }

    /// Iterate over free gaps in address order
    pub fn free_gaps(&self) -> FreeGaps<'_> {
        FreeGaps {
            blocks: self.allocated.iter(),
            cursor: 0,
            total: self.total_size,
            done: false,
        }
    }

    /// Largest request that would currently succeed
    pub fn largest_free_gap(&self) -> usize {
        self.free_gaps().map(|g| g.length).max().unwrap_or(0)
    }

    /// Check whether `block` is currently allocated (exact match)
    pub fn is_allocated(&self, block: &MemoryBlock) -> bool {
        self.position(block).is_some()
    }

    /// Allocate `size` contiguous units for `owner`.
    ///
    /// # Errors
    /// - `InvalidSize` if `size` is zero
    /// - `OutOfMemory` if no single gap is large enough
    pub fn allocate(&mut self, size: usize, owner: ProcessId) -> Result<MemoryBlock, KernelError> {
        if size == 0 {
            return Err(KernelError::InvalidSize);
        }

        let gap = self
            .free_gaps()
            .find(|g| g.length >= size)
            .ok_or_else(|| KernelError::OutOfMemory {
                requested: size,
                largest_free: self.largest_free_gap(),
            })?;

        let block = MemoryBlock {
            start: gap.start,
            length: size,
            owner,
        };
        let idx = self.allocated.partition_point(|b| b.start < block.start);
        self.allocated.insert(idx, block);

        Ok(block)
    }

    /// Release a block. Its contents are zeroed.
    ///
    /// # Errors
    /// - `InvalidBlock` if the block is not currently allocated (including
    ///   a second free of the same block)
    pub fn free(&mut self, block: &MemoryBlock) -> Result<(), KernelError> {
        let idx = self.position(block).ok_or(KernelError::InvalidBlock)?;
        self.allocated.remove(idx);
        self.backing[block.start..block.end()].fill(0);
        Ok(())
    }

    /// Copy `data` to the start of an allocated block.
    ///
    /// # Errors
    /// - `InvalidBlock` if the block is not allocated
    /// - `InvalidSize` if `data` is longer than the block
    pub fn write(&mut self, block: &MemoryBlock, data: &[u8]) -> Result<(), KernelError> {
        self.position(block).ok_or(KernelError::InvalidBlock)?;
        if data.len() > block.length {
            return Err(KernelError::InvalidSize);
        }
        self.backing[block.start..block.start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Borrow the first `len` units of an allocated block.
    pub fn read(&self, block: &MemoryBlock, len: usize) -> Result<&[u8], KernelError> {
        self.position(block).ok_or(KernelError::InvalidBlock)?;
        if len > block.length {
            return Err(KernelError::InvalidBlock);
        }
        Ok(&self.backing[block.start..block.start + len])
    }

    /// Current usage summary
    pub fn status(&self) -> MemoryStatus {
        let used = self.used();
        let (free_gaps, largest_free_gap) = self
            .free_gaps()
            .fold((0, 0), |(count, largest), g| (count + 1, largest.max(g.length)));

        MemoryStatus {
            total: self.total_size,
            used,
            free: self.total_size - used,
            free_gaps,
            largest_free_gap,
            allocations: self.allocated.len(),
        }
    }

    fn position(&self, block: &MemoryBlock) -> Option<usize> {
        self.allocated
            .binary_search_by_key(&block.start, |b| b.start)
            .ok()
            .filter(|&idx| self.allocated[idx] == *block)
    }
}

/// Iterator over the free gaps of a `MemoryManager`, lowest address first.
pub struct FreeGaps<'a> {
    blocks: slice::Iter<'a, MemoryBlock>,
    cursor: usize,
    total: usize,
    done: bool,
}

impl Iterator for FreeGaps<'_> {
    type Item = FreeGap;

    fn next(&mut self) -> Option<FreeGap> {
        for block in self.blocks.by_ref() {
            let gap_start = self.cursor;
            self.cursor = block.end();
            if block.start > gap_start {
                return Some(FreeGap {
                    start: gap_start,
                    length: block.start - gap_start,
                });
            }
        }

        if self.done {
            return None;
        }
        self.done = true;

        (self.cursor < self.total).then(|| FreeGap {
            start: self.cursor,
            length: self.total - self.cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: ProcessId = ProcessId(1);
    const P2: ProcessId = ProcessId(2);
    const P3: ProcessId = ProcessId(3);

    fn gaps(mm: &MemoryManager) -> Vec<(usize, usize)> {
        mm.free_gaps().map(|g| (g.start, g.length)).collect()
    }

    fn assert_partition(mm: &MemoryManager) {
        let blocks = mm.blocks();
        for pair in blocks.windows(2) {
            assert!(pair[0].end() <= pair[1].start, "blocks overlap or unsorted");
        }
        let free: usize = mm.free_gaps().map(|g| g.length).sum();
        assert_eq!(mm.used() + free, mm.total_size());
    }

    #[test]
    fn test_allocate_first_fit() {
        let mut mm = MemoryManager::new(100);
        let a = mm.allocate(30, P1).unwrap();
        let b = mm.allocate(30, P2).unwrap();
        assert_eq!(a.start, 0);
        assert_eq!(b.start, 30);

        mm.free(&a).unwrap();
        // The hole at 0 is the first gap large enough for 20
        let c = mm.allocate(20, P3).unwrap();
        assert_eq!(c.start, 0);
        assert_partition(&mm);
    }

    #[test]
    fn test_allocate_zero_size() {
        let mut mm = MemoryManager::new(100);
        assert_eq!(mm.allocate(0, P1), Err(KernelError::InvalidSize));
        assert!(mm.blocks().is_empty());
    }

    #[test]
    fn test_allocate_exact_fit() {
        let mut mm = MemoryManager::new(64);
        let block = mm.allocate(64, P1).unwrap();
        assert_eq!(block.length, 64);
        assert_eq!(mm.free_space(), 0);
        assert_eq!(gaps(&mm), Vec::<(usize, usize)>::new());
        assert_eq!(
            mm.allocate(1, P2),
            Err(KernelError::OutOfMemory {
                requested: 1,
                largest_free: 0
            })
        );
    }

    #[test]
    fn test_allocate_fails_when_fragmented() {
        let mut mm = MemoryManager::new(100);
        let a = mm.allocate(30, P1).unwrap();
        let _b = mm.allocate(20, P2).unwrap();
        let c = mm.allocate(30, P3).unwrap();
        mm.free(&a).unwrap();
        mm.free(&c).unwrap();

        // 80 free in total, but split into 30 + 50
        assert_eq!(mm.free_space(), 80);
        assert_eq!(gaps(&mm), vec![(0, 30), (50, 50)]);
        let before = mm.blocks().to_vec();
        assert_eq!(
            mm.allocate(60, P1),
            Err(KernelError::OutOfMemory {
                requested: 60,
                largest_free: 50
            })
        );
        assert_eq!(mm.blocks(), &before[..]);
    }

    #[test]
    fn test_free_coalesces_neighbours() {
        let mut mm = MemoryManager::new(100);
        let a = mm.allocate(20, P1).unwrap();
        let b = mm.allocate(20, P2).unwrap();
        let c = mm.allocate(20, P3).unwrap();

        mm.free(&a).unwrap();
        mm.free(&c).unwrap();
        assert_eq!(gaps(&mm), vec![(0, 20), (40, 60)]);

        // Freeing the middle block merges all three gaps into one
        mm.free(&b).unwrap();
        assert_eq!(gaps(&mm), vec![(0, 100)]);
        assert_eq!(mm.status().free_gaps, 1);
        assert_eq!(mm.allocate(100, P1).unwrap().start, 0);
    }

    #[test]
    fn test_free_round_trip_restores_state() {
        let mut mm = MemoryManager::new(128);
        let a = mm.allocate(16, P1).unwrap();
        let _b = mm.allocate(32, P2).unwrap();
        mm.free(&a).unwrap();

        let before_blocks = mm.blocks().to_vec();
        let before_status = mm.status();

        let c = mm.allocate(8, P3).unwrap();
        mm.free(&c).unwrap();

        assert_eq!(mm.blocks(), &before_blocks[..]);
        assert_eq!(mm.status(), before_status);
    }

    #[test]
    fn test_double_free_rejected() {
        let mut mm = MemoryManager::new(100);
        let a = mm.allocate(10, P1).unwrap();
        mm.free(&a).unwrap();
        assert_eq!(mm.free(&a), Err(KernelError::InvalidBlock));
    }

    #[test]
    fn test_free_mismatched_block_rejected() {
        let mut mm = MemoryManager::new(100);
        let a = mm.allocate(10, P1).unwrap();

        let wrong_length = MemoryBlock { length: 5, ..a };
        let wrong_owner = MemoryBlock { owner: P2, ..a };
        let unknown = MemoryBlock {
            start: 50,
            length: 10,
            owner: P1,
        };
        assert_eq!(mm.free(&wrong_length), Err(KernelError::InvalidBlock));
        assert_eq!(mm.free(&wrong_owner), Err(KernelError::InvalidBlock));
        assert_eq!(mm.free(&unknown), Err(KernelError::InvalidBlock));
        assert!(mm.is_allocated(&a));
    }

    #[test]
    fn test_write_read_and_zero_on_free() {
        let mut mm = MemoryManager::new(32);
        let a = mm.allocate(8, P1).unwrap();
        mm.write(&a, b"hello").unwrap();
        assert_eq!(mm.read(&a, 5).unwrap(), b"hello");

        assert_eq!(mm.write(&a, b"too long!"), Err(KernelError::InvalidSize));
        assert_eq!(mm.read(&a, 9), Err(KernelError::InvalidBlock));

        mm.free(&a).unwrap();
        assert_eq!(mm.read(&a, 5), Err(KernelError::InvalidBlock));

        // The same range reallocated starts out zeroed
        let b = mm.allocate(8, P2).unwrap();
        assert_eq!(b.start, a.start);
        assert_eq!(mm.read(&b, 5).unwrap(), &[0u8; 5]);
    }

    #[test]
    fn test_status() {
        let mut mm = MemoryManager::new(100);
        let a = mm.allocate(10, P1).unwrap();
        let _b = mm.allocate(40, P2).unwrap();
        mm.free(&a).unwrap();

        let status = mm.status();
        assert_eq!(status.total, 100);
        assert_eq!(status.used, 40);
        assert_eq!(status.free, 60);
        assert_eq!(status.free_gaps, 2);
        assert_eq!(status.largest_free_gap, 50);
        assert_eq!(status.allocations, 1);
        assert_eq!(status.fragmented_bytes(), 10);
    }

    #[test]
    fn test_random_sequences_keep_partition() {
        // Deterministic LCG so failures are reproducible
        let mut seed: u64 = 0x5eed;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        let mut mm = MemoryManager::new(512);
        let mut live: Vec<MemoryBlock> = Vec::new();

        for step in 0..2000 {
            if live.is_empty() || next() % 3 != 0 {
                let size = 1 + next() % 96;
                if let Ok(block) = mm.allocate(size, ProcessId(step)) {
                    live.push(block);
                }
            } else {
                let idx = next() % live.len();
                let block = live.swap_remove(idx);
                mm.free(&block).unwrap();
            }
            assert_partition(&mm);
            assert_eq!(mm.blocks().len(), live.len());
        }

        for block in live.drain(..) {
            mm.free(&block).unwrap();
        }
        assert_eq!(gaps(&mm), vec![(0, 512)]);
    }
}
