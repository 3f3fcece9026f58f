//! Managed memory space
//!
//! A memory space tracks a fixed address range `[0, max_size)` with two
//! pooled lists: free blocks and allocated blocks. Neither list is kept in
//! address order; blocks appear in the order operations insert them.

use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "log")]
use log::{debug, error, trace, warn};

#[cfg(feature = "tracking")]
use crate::stats::{MemoryStatsReporter, OpCounters};
use crate::{
    list::{NodePool, PoolStats, PooledList, PooledListIter},
    stats::SpaceStats,
    AllocError, AllocResult, MemoryBlock,
};

/// First-fit memory space over two pooled range lists
///
/// Both lists draw their nodes from one shared pool. `malloc` carves blocks
/// off free ranges, `free` recycles them whole, and `defrag` coalesces free
/// ranges that are both contiguous and neighbours in list order.
pub struct MemorySpace {
    max_size: usize,
    pool: NodePool<MemoryBlock>,
    free_list: PooledList<MemoryBlock>,
    allocated_list: PooledList<MemoryBlock>,
    #[cfg(feature = "tracking")]
    counters: OpCounters,
}

impl MemorySpace {
    /// Create a memory space with one free block spanning `[0, max_size)`
    ///
    /// A zero-sized space has an empty free list.
    pub fn new(max_size: usize) -> Self {
        Self::with_node_capacity(max_size, 0)
    }

    /// Same as [`MemorySpace::new`], reserving room for `nodes` list nodes
    pub fn with_node_capacity(max_size: usize, nodes: usize) -> Self {
        let mut space = Self {
            max_size,
            pool: NodePool::with_capacity(nodes),
            free_list: PooledList::new(),
            allocated_list: PooledList::new(),
            #[cfg(feature = "tracking")]
            counters: OpCounters::default(),
        };
        space.seed();
        space
    }

    fn seed(&mut self) {
        if let Ok(block) = MemoryBlock::try_new(0, self.max_size) {
            self.free_list.push_back(&mut self.pool, block);
        }
    }

    /// Return the space to its freshly created state
    pub fn reset(&mut self) {
        self.free_list.clear(&mut self.pool);
        self.allocated_list.clear(&mut self.pool);
        self.seed();
        #[cfg(feature = "tracking")]
        {
            self.counters = OpCounters::default();
        }
    }

    /// Allocate `length` units with first fit
    ///
    /// Returns the base address of the new block, or `Ok(None)` when no
    /// single free block is large enough.
    pub fn malloc(&mut self, length: usize) -> AllocResult<Option<usize>> {
        if length == 0 {
            return Err(AllocError::InvalidParam);
        }

        let Some((node_idx, prev_idx)) = self
            .free_list
            .find_with_prev(&self.pool, |block| block.length >= length)
        else {
            warn!("malloc({}): no free block large enough", length);
            #[cfg(feature = "tracking")]
            {
                self.counters.failed_mallocs += 1;
                MemoryStatsReporter::report_alloc_failure(&self.stats(), length);
            }
            return Ok(None);
        };

        let exact_fit = self
            .pool
            .get_node(node_idx)
            .is_some_and(|node| node.data.length == length);

        let allocated = if exact_fit {
            self.free_list
                .remove_with_prev(&mut self.pool, node_idx, prev_idx)
        } else {
            self.pool
                .get_node_mut(node_idx)
                .map(|node| node.data.split_front(length))
        };

        let Some(block) = allocated else {
            error!("malloc({}): free list node {:?} vanished", length, node_idx);
            return Ok(None);
        };

        self.allocated_list.push_back(&mut self.pool, block);
        #[cfg(feature = "tracking")]
        {
            self.counters.mallocs += 1;
        }
        debug!("malloc({}) -> {:#x}", length, block.base_addr);
        Ok(Some(block.base_addr))
    }

    /// Free the allocated block whose base address is `address`
    ///
    /// The block is appended unchanged to the free list; no merging happens
    /// until [`MemorySpace::defrag`] runs.
    pub fn free(&mut self, address: usize) -> AllocResult {
        let not_allocated = AllocError::NotAllocated { addr: address };

        let Some((node_idx, prev_idx)) = self
            .allocated_list
            .find_with_prev(&self.pool, |block| block.base_addr == address)
        else {
            warn!("free({:#x}): address not in allocated list", address);
            #[cfg(feature = "tracking")]
            {
                self.counters.failed_frees += 1;
            }
            return Err(not_allocated);
        };

        let block = self
            .allocated_list
            .remove_with_prev(&mut self.pool, node_idx, prev_idx)
            .ok_or(not_allocated)?;
        self.free_list.push_back(&mut self.pool, block);

        #[cfg(feature = "tracking")]
        {
            self.counters.frees += 1;
        }
        debug!("free({:#x}) released {} units", address, block.length);
        Ok(())
    }

    /// Coalesce free blocks that are contiguous and adjacent in list order
    ///
    /// Returns the number of merges. Blocks that touch in the address space
    /// but are not list neighbours stay separate.
    pub fn defrag(&mut self) -> usize {
        let merges = self.free_list.coalesce(&mut self.pool, |current, next| {
            let merged = current.absorb(next);
            if merged {
                trace!("defrag: grew free block to {}", current);
            }
            merged
        });
        debug_assert!(self.free_list.check_integrity(&self.pool));

        #[cfg(feature = "tracking")]
        {
            self.counters.defrags += 1;
            self.counters.merges += merges;
        }
        debug!(
            "defrag: {} merges, {} free blocks left",
            merges,
            self.free_list.len()
        );
        merges
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Free blocks in list order
    pub fn free_blocks(&self) -> PooledListIter<'_, MemoryBlock> {
        self.free_list.iter(&self.pool)
    }

    /// Allocated blocks in list order
    pub fn allocated_blocks(&self) -> PooledListIter<'_, MemoryBlock> {
        self.allocated_list.iter(&self.pool)
    }

    pub fn free_list(&self) -> &PooledList<MemoryBlock> {
        &self.free_list
    }

    pub fn allocated_list(&self) -> &PooledList<MemoryBlock> {
        &self.allocated_list
    }

    /// The pool backing both lists
    pub fn node_pool(&self) -> &NodePool<MemoryBlock> {
        &self.pool
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.get_stats()
    }

    pub fn free_block_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn allocated_block_count(&self) -> usize {
        self.allocated_list.len()
    }

    pub fn free_bytes(&self) -> usize {
        self.free_blocks().map(|block| block.length).sum()
    }

    pub fn allocated_bytes(&self) -> usize {
        self.allocated_blocks().map(|block| block.length).sum()
    }

    /// Length of the largest free block, 0 if none
    pub fn largest_free_block(&self) -> usize {
        self.free_blocks()
            .map(|block| block.length)
            .max()
            .unwrap_or(0)
    }

    /// Whether an allocated block starts at `addr`
    pub fn is_allocated(&self, addr: usize) -> bool {
        self.allocation_at(addr).is_some()
    }

    /// The allocated block starting at `addr`
    pub fn allocation_at(&self, addr: usize) -> Option<MemoryBlock> {
        self.allocated_blocks()
            .find(|block| block.base_addr == addr)
            .copied()
    }

    pub fn stats(&self) -> SpaceStats {
        SpaceStats {
            max_size: self.max_size,
            free_bytes: self.free_bytes(),
            allocated_bytes: self.allocated_bytes(),
            free_blocks: self.free_list.len(),
            allocated_blocks: self.allocated_list.len(),
            largest_free_block: self.largest_free_block(),
        }
    }

    #[cfg(feature = "tracking")]
    pub fn counters(&self) -> OpCounters {
        self.counters
    }

    /// Verify list structure and address accounting
    ///
    /// Both lists must be consistent, their lengths must add up to
    /// `max_size`, and no two tracked blocks may overlap.
    pub fn check_integrity(&self) -> bool {
        if !self.free_list.check_integrity(&self.pool)
            || !self.allocated_list.check_integrity(&self.pool)
        {
            return false;
        }

        if self.free_bytes() + self.allocated_bytes() != self.max_size {
            error!(
                "accounting mismatch: {} free + {} allocated != {}",
                self.free_bytes(),
                self.allocated_bytes(),
                self.max_size
            );
            return false;
        }

        let blocks: Vec<MemoryBlock> = self
            .free_blocks()
            .chain(self.allocated_blocks())
            .copied()
            .collect();
        for (i, block) in blocks.iter().enumerate() {
            if block.end() > self.max_size {
                error!("block {} exceeds space of size {}", block, self.max_size);
                return false;
            }
            for other in &blocks[i + 1..] {
                if block.overlaps(other) {
                    error!("blocks {} and {} overlap", block, other);
                    return false;
                }
            }
        }
        true
    }
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}",
            self.free_list.display(&self.pool),
            self.allocated_list.display(&self.pool)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn free_of(space: &MemorySpace) -> Vec<MemoryBlock> {
        space.free_blocks().copied().collect()
    }

    fn allocated_of(space: &MemorySpace) -> Vec<MemoryBlock> {
        space.allocated_blocks().copied().collect()
    }

    fn block(base_addr: usize, length: usize) -> MemoryBlock {
        MemoryBlock::new(base_addr, length)
    }

    #[test]
    fn test_new_space() {
        let space = MemorySpace::new(100);
        assert_eq!(free_of(&space), [block(0, 100)]);
        assert!(space.allocated_blocks().next().is_none());
        assert_eq!(space.max_size(), 100);
        assert!(space.check_integrity());
    }

    #[test]
    fn test_zero_sized_space() {
        let mut space = MemorySpace::new(0);
        assert_eq!(space.free_block_count(), 0);
        assert_eq!(space.malloc(1), Ok(None));
        assert!(space.check_integrity());
    }

    #[test]
    fn test_malloc_rejects_zero_length() {
        let mut space = MemorySpace::new(100);
        assert_eq!(space.malloc(0), Err(AllocError::InvalidParam));
        assert_eq!(free_of(&space), [block(0, 100)]);
        assert_eq!(space.allocated_block_count(), 0);
    }

    #[test]
    fn test_malloc_split_and_exact_fit() {
        let mut space = MemorySpace::new(100);

        assert_eq!(space.malloc(30), Ok(Some(0)));
        assert_eq!(free_of(&space), [block(30, 70)]);
        assert_eq!(allocated_of(&space), [block(0, 30)]);

        // Exact fit removes the free entry instead of leaving a zero-length block
        assert_eq!(space.malloc(70), Ok(Some(30)));
        assert_eq!(space.free_block_count(), 0);
        assert_eq!(allocated_of(&space), [block(0, 30), block(30, 70)]);
        assert!(space.check_integrity());

        assert_eq!(space.malloc(1), Ok(None));
    }

    #[test]
    fn test_malloc_first_fit_in_list_order() {
        let mut space = MemorySpace::new(100);
        space.malloc(10).unwrap();
        space.malloc(40).unwrap();
        space.malloc(20).unwrap();
        // free list: (70, 30)
        space.free(10).unwrap();
        // free list: (70, 30) (10, 40)
        assert_eq!(free_of(&space), [block(70, 30), block(10, 40)]);

        // (70, 30) comes first in list order even though (10, 40) is lower
        assert_eq!(space.malloc(25), Ok(Some(70)));
        assert_eq!(free_of(&space), [block(95, 5), block(10, 40)]);

        assert_eq!(space.malloc(35), Ok(Some(10)));
        assert_eq!(free_of(&space), [block(95, 5), block(45, 5)]);
        assert!(space.check_integrity());
    }

    #[test]
    fn test_malloc_does_not_combine_blocks() {
        let mut space = MemorySpace::new(100);
        space.malloc(50).unwrap();
        space.malloc(50).unwrap();
        space.free(50).unwrap();
        space.free(0).unwrap();
        assert_eq!(free_of(&space), [block(50, 50), block(0, 50)]);

        let before = free_of(&space);
        assert_eq!(space.malloc(60), Ok(None));
        assert_eq!(free_of(&space), before);
        assert_eq!(space.allocated_block_count(), 0);
    }

    #[test]
    fn test_free_unknown_address() {
        let mut space = MemorySpace::new(100);
        space.malloc(30).unwrap();

        assert_eq!(space.free(5), Err(AllocError::NotAllocated { addr: 5 }));
        assert_eq!(free_of(&space), [block(30, 70)]);
        assert_eq!(allocated_of(&space), [block(0, 30)]);

        space.free(0).unwrap();
        assert_eq!(space.free(0), Err(AllocError::NotAllocated { addr: 0 }));
    }

    #[test]
    fn test_free_interior_allocation() {
        let mut space = MemorySpace::new(100);
        space.malloc(10).unwrap();
        space.malloc(10).unwrap();
        space.malloc(10).unwrap();

        space.free(10).unwrap();
        assert_eq!(allocated_of(&space), [block(0, 10), block(20, 10)]);
        assert_eq!(free_of(&space), [block(30, 70), block(10, 10)]);

        space.free(20).unwrap();
        assert_eq!(allocated_of(&space), [block(0, 10)]);
        assert_eq!(space.allocated_list().last(), space.allocated_list().first());
        assert!(space.check_integrity());
    }

    #[test]
    fn test_defrag_merges_list_neighbours() {
        let mut space = MemorySpace::new(100);
        let a = space.malloc(20).unwrap().unwrap();
        let b = space.malloc(20).unwrap().unwrap();
        let c = space.malloc(20).unwrap().unwrap();
        space.free(a).unwrap();
        space.free(b).unwrap();
        space.free(c).unwrap();
        // (60, 40) (0, 20) (20, 20) (40, 20)
        assert_eq!(space.defrag(), 2);
        assert_eq!(free_of(&space), [block(60, 40), block(0, 60)]);
        assert_eq!(space.free_block_count(), 2);
        assert!(space.check_integrity());

        // idempotent
        assert_eq!(space.defrag(), 0);
        assert_eq!(free_of(&space), [block(60, 40), block(0, 60)]);
    }

    #[test]
    fn test_defrag_full_cycle_in_address_order() {
        let mut space = MemorySpace::new(64);
        assert_eq!(space.malloc(64), Ok(Some(0)));
        space.free(0).unwrap();
        space.defrag();
        assert_eq!(free_of(&space), [block(0, 64)]);
    }

    #[test]
    fn test_reset() {
        let mut space = MemorySpace::new(100);
        space.malloc(30).unwrap();
        space.malloc(20).unwrap();
        space.free(0).unwrap();

        space.reset();
        assert_eq!(free_of(&space), [block(0, 100)]);
        assert_eq!(space.allocated_block_count(), 0);
        assert_eq!(space.pool_stats().allocated_nodes, 1);
        assert!(space.check_integrity());
    }

    #[test]
    fn test_queries() {
        let mut space = MemorySpace::new(100);
        space.malloc(30).unwrap();
        space.malloc(20).unwrap();
        space.free(0).unwrap();

        assert_eq!(space.free_bytes(), 80);
        assert_eq!(space.allocated_bytes(), 20);
        assert_eq!(space.largest_free_block(), 50);
        assert!(space.is_allocated(30));
        assert!(!space.is_allocated(0));
        assert_eq!(space.allocation_at(30), Some(block(30, 20)));

        let stats = space.stats();
        assert_eq!(
            stats,
            SpaceStats {
                max_size: 100,
                free_bytes: 80,
                allocated_bytes: 20,
                free_blocks: 2,
                allocated_blocks: 1,
                largest_free_block: 50,
            }
        );
        assert_eq!(stats.fragmentation(), 38);
    }

    #[test]
    fn test_list_access_through_space() {
        let mut space = MemorySpace::new(100);
        space.malloc(30).unwrap();
        space.malloc(20).unwrap();

        let pool = space.node_pool();
        let allocated = space.allocated_list();
        assert_eq!(allocated.get_value(pool, 1), Ok(&block(30, 20)));
        assert_eq!(allocated.index_of(pool, &block(0, 30)), Some(0));
        assert_eq!(allocated.get_node(pool, 2), Ok(None));
    }

    #[test]
    fn test_pool_nodes_recycled() {
        let mut space = MemorySpace::new(1000);
        for _ in 0..10 {
            let addr = space.malloc(10).unwrap().unwrap();
            space.free(addr).unwrap();
            space.defrag();
        }
        // Only free blocks hold nodes; vacated slots are reused
        assert_eq!(space.pool_stats().allocated_nodes, space.free_block_count());
        assert!(space.pool_stats().total_slots <= 3);
    }

    #[test]
    fn test_display() {
        let mut space = MemorySpace::new(100);
        space.malloc(30).unwrap();
        space.malloc(20).unwrap();
        space.free(0).unwrap();
        assert_eq!(space.to_string(), "(50 , 50) (0 , 30) \n(30 , 20) ");

        let fresh = MemorySpace::new(10);
        assert_eq!(fresh.to_string(), "(0 , 10) \n");
    }

    #[cfg(feature = "tracking")]
    #[test]
    fn test_counters() {
        let mut space = MemorySpace::new(100);
        space.malloc(50).unwrap();
        space.malloc(60).unwrap();
        space.free(0).unwrap();
        let _ = space.free(7);
        space.defrag();

        let counters = space.counters();
        assert_eq!(counters.mallocs, 1);
        assert_eq!(counters.failed_mallocs, 1);
        assert_eq!(counters.frees, 1);
        assert_eq!(counters.failed_frees, 1);
        assert_eq!(counters.defrags, 1);
        assert_eq!(counters.merges, 0);

        space.reset();
        assert_eq!(space.counters(), OpCounters::default());
    }

    #[test]
    fn test_integrity_detects_nothing_on_long_run() {
        let mut space = MemorySpace::new(256);
        let mut live = vec![];
        for i in 1..40usize {
            if let Ok(Some(addr)) = space.malloc(i % 7 + 1) {
                live.push(addr);
            }
            if i % 3 == 0 {
                if let Some(addr) = live.pop() {
                    space.free(addr).unwrap();
                }
            }
            if i % 5 == 0 {
                space.defrag();
            }
            assert!(space.check_integrity());
        }
    }
}
