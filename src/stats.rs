//! Statistics and debugging for memory spaces
//!
//! Provides state summaries, operation counters and failure reporting.

/// Snapshot of a memory space's accounting
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpaceStats {
    pub max_size: usize,
    pub free_bytes: usize,
    pub allocated_bytes: usize,
    pub free_blocks: usize,
    pub allocated_blocks: usize,
    pub largest_free_block: usize,
}

impl SpaceStats {
    /// External fragmentation of the free list, in percent
    ///
    /// 0 when nothing is free or all free capacity sits in one block.
    pub fn fragmentation(&self) -> usize {
        if self.free_bytes == 0 {
            return 0;
        }
        100 - self.largest_free_block * 100 / self.free_bytes
    }
}

/// Running counters of memory space operations
#[cfg(feature = "tracking")]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OpCounters {
    pub mallocs: usize,
    pub failed_mallocs: usize,
    pub frees: usize,
    pub failed_frees: usize,
    pub defrags: usize,
    pub merges: usize,
}

/// Detailed memory statistics reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Log the state of a space that could not satisfy a request
    /// This is a standalone function to keep allocation logic clean
    #[allow(unused_variables)]
    pub fn report_alloc_failure(stats: &SpaceStats, request: usize) {
        #[cfg(feature = "log")]
        use log::warn;
        warn!("========================================");
        warn!("Request: {} units (no fitting free block)", request);
        warn!("  Max size: {}", stats.max_size);
        warn!(
            "  Free: {} units in {} blocks (largest {})",
            stats.free_bytes, stats.free_blocks, stats.largest_free_block
        );
        warn!(
            "  Allocated: {} units in {} blocks",
            stats.allocated_bytes, stats.allocated_blocks
        );
        warn!("  Fragmentation: {}%", stats.fragmentation());
        warn!("========================================");
    }
}
