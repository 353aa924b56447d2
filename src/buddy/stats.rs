//! Statistics and debugging for the buddy pool
//!
//! Provides usage counters and allocation failure reporting.

use alloc::vec::Vec;

use super::block_table::BlockTableStats;

/// Buddy pool statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub total_units: usize,
    pub free_units: usize,
    pub used_units: usize,
    /// Free block count per order, indexed by order
    pub free_blocks_by_order: Vec<usize>,
    pub process_count: usize,
    /// Bytes asked for by resident processes
    pub requested_bytes: usize,
    /// Bytes handed to resident processes after rounding up
    pub allocated_bytes: usize,
    pub total_allocations: usize,
    pub total_deallocations: usize,
    pub failed_allocations: usize,
    /// Block record arena usage
    pub table: BlockTableStats,
}

impl PoolStats {
    /// Bytes lost to rounding requests up to a power-of-two block
    pub fn internal_fragmentation(&self) -> usize {
        self.allocated_bytes.saturating_sub(self.requested_bytes)
    }
}

/// Running counters kept by the pool between snapshots
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Counters {
    pub requested_bytes: usize,
    pub allocated_bytes: usize,
    pub total_allocations: usize,
    pub total_deallocations: usize,
    pub failed_allocations: usize,
}

/// Detailed memory statistics reporter
pub struct MemoryStatsReporter;

impl MemoryStatsReporter {
    /// Print detailed allocation failure statistics
    /// This is a standalone function to keep allocation logic clean
    #[allow(unused_variables)]
    pub fn print_alloc_failure_stats(
        min_chunk_size: usize,
        stats: &PoolStats,
        name: &str,
        request_size: usize,
        request_order: usize,
    ) {
        #[cfg(feature = "log")]
        use log::error;
        error!("========================================");
        error!(
            "Request: {:?} wants {} bytes (order {}, {} bytes)",
            name,
            request_size,
            request_order,
            min_chunk_size << request_order
        );
        error!(
            "  Total units: {} ({} bytes)",
            stats.total_units,
            stats.total_units * min_chunk_size
        );
        error!(
            "  Free units: {} ({} bytes)",
            stats.free_units,
            stats.free_units * min_chunk_size
        );
        error!(
            "  Used units: {} ({} bytes, {} wasted to rounding)",
            stats.used_units,
            stats.used_units * min_chunk_size,
            stats.internal_fragmentation()
        );
        error!("  Resident processes: {}", stats.process_count);
        error!(
            "  Block records: {} live in {} arena slots",
            stats.table.live_blocks, stats.table.arena_slots
        );
        error!("  Free blocks by order:");

        for (order, &count) in stats.free_blocks_by_order.iter().enumerate().rev() {
            if count > 0 {
                let block_size = min_chunk_size << order;
                error!(
                    "    Order {}: {} blocks ({} bytes each, {} bytes total)",
                    order,
                    count,
                    block_size,
                    count * block_size
                );
            }
        }
        error!("========================================");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_fragmentation() {
        let stats = PoolStats {
            requested_bytes: 300,
            allocated_bytes: 384,
            ..Default::default()
        };
        assert_eq!(stats.internal_fragmentation(), 84);
    }
}
