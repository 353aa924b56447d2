//! Buddy pool allocator
//!
//! Hands out power-of-two blocks of a fixed pool to named processes.
//! Allocation pops the smallest sufficient free block and splits it down to
//! the required order; deallocation frees the block and coalesces it with
//! its buddy for as long as the buddy is free and of the same order.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "log")]
use log::{debug, info, warn};

use crate::config::PoolConfig;
use crate::{order_for_units, AllocError, AllocResult, ConfigResult, NamedAllocator};

use super::{
    block_table::BlockTable,
    buddy_block::{buddy_start, Block, BlockHandle, BlockId, BlockInfo},
    free_list::FreeListIndex,
    process::ProcessRecord,
};

#[cfg(feature = "tracking")]
use super::stats::{Counters, MemoryStatsReporter, PoolStats};

/// Internal consistency failure reported by [`BuddyPool::check_invariants`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Blocks leave a gap or overlap at `expected`
    Tiling { expected: usize, found: usize },
    /// Blocks do not reach the end of the pool
    Coverage { covered: usize, units: usize },
    /// Block start is not a multiple of its size
    Misaligned { start_unit: usize, order: usize },
    /// Block order is above the root order
    OrderTooLarge { start_unit: usize, order: usize },
    /// A free block is missing from its free list, or the lists hold extras
    FreeList { start_unit: usize },
    /// Owner record and name index disagree about a block
    Owner { start_unit: usize },
    /// The name index holds names with no occupied block
    NameIndex { names: usize, occupied: usize },
    /// Two free buddies of the same order were left unmerged
    UnmergedBuddies { start_unit: usize, order: usize },
}

/// Binary buddy allocator over a fixed pool of `units` minimum chunks
pub struct BuddyPool {
    config: PoolConfig,
    table: BlockTable,
    free_lists: FreeListIndex,
    #[cfg(feature = "tracking")]
    counters: Counters,
}

impl BuddyPool {
    /// Create a pool whose whole span is a single free root block.
    pub fn new(config: PoolConfig) -> Self {
        let mut pool = Self {
            config,
            table: BlockTable::new(),
            free_lists: FreeListIndex::new(config.max_order()),
            #[cfg(feature = "tracking")]
            counters: Counters::default(),
        };
        pool.seed_root();

        info!(
            "buddy pool: {} bytes, {} units of {} bytes, max order {}",
            config.pool_size(),
            config.units(),
            config.min_chunk_size(),
            config.max_order()
        );
        pool
    }

    /// Validate the geometry and create the pool.
    pub fn init(pool_size: usize, min_chunk_size: usize) -> ConfigResult<Self> {
        let config = PoolConfig::new(pool_size, min_chunk_size)?;
        Ok(Self::new(config))
    }

    fn seed_root(&mut self) {
        self.table.clear();
        self.free_lists.clear();
        let root = self.table.insert(Block::free(0, self.max_order()));
        self.free_lists.push(&mut self.table, root);
    }

    /// Drop every process and return to a single free root block.
    pub fn reset(&mut self) {
        let _dropped = self.table.name_count();
        self.seed_root();
        #[cfg(feature = "tracking")]
        {
            self.counters.requested_bytes = 0;
            self.counters.allocated_bytes = 0;
        }
        info!("buddy pool: reset, {} processes dropped", _dropped);
    }

    pub const fn config(&self) -> PoolConfig {
        self.config
    }

    pub const fn pool_size(&self) -> usize {
        self.config.pool_size()
    }

    pub const fn min_chunk_size(&self) -> usize {
        self.config.min_chunk_size()
    }

    pub const fn units(&self) -> usize {
        self.config.units()
    }

    pub const fn max_order(&self) -> usize {
        self.config.max_order()
    }

    /// Smallest order whose block holds `size` bytes.
    pub fn order_for_size(&self, size: usize) -> AllocResult<usize> {
        if size == 0 {
            return Err(AllocError::InvalidSize);
        }
        let units = size.div_ceil(self.min_chunk_size());
        let order = order_for_units(units).ok_or(AllocError::InvalidSize)?;
        if order > self.max_order() {
            return Err(AllocError::InvalidSize);
        }
        Ok(order)
    }

    /// Allocate a block of at least `size` bytes for process `name`.
    pub fn allocate(&mut self, name: &str, size: usize) -> AllocResult<BlockHandle> {
        if self.table.contains_name(name) {
            warn!("buddy pool: process {:?} is already resident", name);
            return Err(AllocError::DuplicateName);
        }

        let order = match self.order_for_size(size) {
            Ok(order) => order,
            Err(e) => {
                warn!(
                    "buddy pool: {:?} requested {} bytes, pool holds {}",
                    name,
                    size,
                    self.pool_size()
                );
                return Err(e);
            }
        };

        let Some(found_order) = self.free_lists.first_non_empty(order) else {
            debug!(
                "buddy pool: allocation failure: {:?} wants {} bytes (order {})",
                name, size, order
            );
            #[cfg(feature = "tracking")]
            {
                self.counters.failed_allocations += 1;
            }
            self.print_alloc_failure_stats(name, size, order);
            return Err(AllocError::OutOfMemory);
        };

        let id = match self.free_lists.pop(&mut self.table, found_order) {
            Some(id) => id,
            None => unreachable!("free list for order {} reported non-empty", found_order),
        };
        self.split(id, order);
        let handle = self.table[id].handle(self.min_chunk_size());
        debug!(
            "buddy pool: allocated units [{}, {}) to {:?} ({} bytes requested)",
            handle.start_unit,
            handle.end_unit(),
            name,
            size
        );

        let owner = String::from(name);
        self.table[id].owner = Some(ProcessRecord::new(owner.clone(), size, id));
        self.table.bind_name(owner, id);

        #[cfg(feature = "tracking")]
        {
            self.counters.total_allocations += 1;
            self.counters.requested_bytes += size;
            self.counters.allocated_bytes += handle.size_bytes;
        }

        debug_assert_eq!(self.check_invariants(), Ok(()));
        Ok(handle)
    }

    /// Release the block held by process `name` and coalesce it.
    pub fn deallocate(&mut self, name: &str) -> AllocResult {
        let Some(id) = self.table.unbind_name(name) else {
            warn!("buddy pool: deallocate of unknown process {:?}", name);
            return Err(AllocError::NotFound);
        };

        let record = self.table[id].owner.take();
        debug_assert!(record.as_ref().is_some_and(|r| r.block == id));

        #[cfg(feature = "tracking")]
        {
            let size_bytes = self.config.block_size(self.table[id].order);
            let requested = record.as_ref().map_or(0, |r| r.requested_size);
            self.counters.total_deallocations += 1;
            self.counters.requested_bytes -= requested;
            self.counters.allocated_bytes -= size_bytes;
        }
        drop(record);

        debug!("buddy pool: released {:?}", name);
        self.coalesce(id);
        debug_assert_eq!(self.check_invariants(), Ok(()));
        Ok(())
    }

    /// Split a detached block in place until it reaches `order`, pushing
    /// every upper half on the free list.
    fn split(&mut self, id: BlockId, order: usize) {
        loop {
            let block = &mut self.table[id];
            if block.order <= order {
                break;
            }
            block.order -= 1;
            let half = block.order;
            let sibling_start = block.start_unit + (1 << half);

            let sibling = self.table.insert(Block::free(sibling_start, half));
            self.free_lists.push(&mut self.table, sibling);
            debug!(
                "buddy pool: split, free half [{}, {}) at order {}",
                sibling_start,
                sibling_start + (1 << half),
                half
            );
        }
    }

    /// Merge a detached free block with its buddies and push the result on
    /// the free list.
    fn coalesce(&mut self, id: BlockId) {
        let max_order = self.max_order();
        loop {
            let (start, order) = {
                let block = &self.table[id];
                (block.start_unit, block.order)
            };
            if order >= max_order {
                break;
            }

            let buddy = buddy_start(start, order);
            let Some(buddy_id) = self.table.find_by_start(buddy) else {
                break;
            };
            let mergeable = {
                let block = &self.table[buddy_id];
                block.is_free() && block.order == order
            };
            if !mergeable {
                break;
            }

            self.free_lists.remove(&mut self.table, buddy_id);
            self.table.remove(buddy_id);
            self.table.move_start(id, start.min(buddy));
            self.table[id].order = order + 1;
            debug!(
                "buddy pool: merged units {} and {} into order {}",
                start,
                buddy,
                order + 1
            );
        }

        self.free_lists.push(&mut self.table, id);
        debug!(
            "buddy pool: free block [{}, {}) at order {}",
            self.table[id].start_unit,
            self.table[id].end_unit(),
            self.table[id].order
        );
    }

    /// Look up the block held by process `name`.
    pub fn query(&self, name: &str) -> Option<BlockInfo> {
        let id = self.table.find_by_name(name)?;
        Some(self.table[id].info(self.min_chunk_size()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_name(name)
    }

    /// Look up the block, free or occupied, whose span covers `unit`.
    pub fn block_at(&self, unit: usize) -> Option<BlockInfo> {
        let id = self.table.find_covering(unit)?;
        Some(self.table[id].info(self.min_chunk_size()))
    }

    /// Every live block in ascending start-unit order.
    pub fn snapshot(&self) -> Vec<BlockInfo> {
        let min_chunk = self.min_chunk_size();
        self.table
            .iter()
            .map(|(_, block)| block.info(min_chunk))
            .collect()
    }

    /// Resident processes in ascending start-unit order.
    pub fn processes(&self) -> Vec<BlockInfo> {
        let min_chunk = self.min_chunk_size();
        self.table
            .iter()
            .filter(|(_, block)| !block.is_free())
            .map(|(_, block)| block.info(min_chunk))
            .collect()
    }

    pub fn process_count(&self) -> usize {
        self.table.name_count()
    }

    /// Free blocks of one order, most recently freed first
    pub fn free_blocks(&self, order: usize) -> impl Iterator<Item = BlockHandle> + '_ {
        let min_chunk = self.min_chunk_size();
        self.free_lists
            .iter(&self.table, order)
            .map(move |id| self.table[id].handle(min_chunk))
    }

    /// Get the number of free blocks of a specific order
    pub fn free_block_count(&self, order: usize) -> usize {
        self.free_lists.len(order)
    }

    /// Order of the largest block that could be handed out right now
    pub fn largest_free_order(&self) -> Option<usize> {
        (0..=self.max_order())
            .rev()
            .find(|&order| !self.free_lists.is_empty(order))
    }

    pub fn total_bytes(&self) -> usize {
        self.pool_size()
    }

    pub fn available_bytes(&self) -> usize {
        self.free_lists.free_units() * self.min_chunk_size()
    }

    pub fn used_bytes(&self) -> usize {
        self.total_bytes() - self.available_bytes()
    }

    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> PoolStats {
        let total_units = self.units();
        let free_units = self.free_lists.free_units();
        PoolStats {
            total_units,
            free_units,
            used_units: total_units - free_units,
            free_blocks_by_order: (0..=self.max_order())
                .map(|order| self.free_lists.len(order))
                .collect(),
            process_count: self.table.name_count(),
            requested_bytes: self.counters.requested_bytes,
            allocated_bytes: self.counters.allocated_bytes,
            total_allocations: self.counters.total_allocations,
            total_deallocations: self.counters.total_deallocations,
            failed_allocations: self.counters.failed_allocations,
            table: self.table.get_stats(),
        }
    }

    /// Print detailed allocation failure statistics
    #[cfg(feature = "tracking")]
    pub fn print_alloc_failure_stats(&self, name: &str, size: usize, order: usize) {
        MemoryStatsReporter::print_alloc_failure_stats(
            self.min_chunk_size(),
            &self.get_stats(),
            name,
            size,
            order,
        );
    }

    #[cfg(not(feature = "tracking"))]
    pub fn print_alloc_failure_stats(&self, _name: &str, _size: usize, _order: usize) {
        // No-op when tracking is disabled
    }

    /// Walk the whole table and free lists and verify the buddy invariants.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let max_order = self.max_order();
        let mut expected = 0;
        let mut free_blocks = 0;
        let mut occupied = 0;

        for (id, block) in self.table.iter() {
            let start_unit = block.start_unit;
            let order = block.order;
            if start_unit != expected {
                return Err(InvariantViolation::Tiling {
                    expected,
                    found: start_unit,
                });
            }
            if order > max_order {
                return Err(InvariantViolation::OrderTooLarge { start_unit, order });
            }
            if !crate::is_aligned(start_unit, order) {
                return Err(InvariantViolation::Misaligned { start_unit, order });
            }

            match &block.owner {
                None => {
                    free_blocks += 1;
                    if !self.free_lists.is_linked(&self.table, id) {
                        return Err(InvariantViolation::FreeList { start_unit });
                    }
                    if order < max_order {
                        let buddy = self
                            .table
                            .find_by_start(block.buddy_start())
                            .map(|buddy_id| &self.table[buddy_id]);
                        if buddy.is_some_and(|b| b.is_free() && b.order == order) {
                            return Err(InvariantViolation::UnmergedBuddies { start_unit, order });
                        }
                    }
                }
                Some(record) => {
                    occupied += 1;
                    if record.block != id || self.table.find_by_name(&record.name) != Some(id) {
                        return Err(InvariantViolation::Owner { start_unit });
                    }
                }
            }
            expected = block.end_unit();
        }

        if expected != self.units() {
            return Err(InvariantViolation::Coverage {
                covered: expected,
                units: self.units(),
            });
        }
        if self.free_lists.total_blocks() != free_blocks {
            return Err(InvariantViolation::FreeList { start_unit: expected });
        }
        if self.table.name_count() != occupied {
            return Err(InvariantViolation::NameIndex {
                names: self.table.name_count(),
                occupied,
            });
        }
        Ok(())
    }
}

impl Default for BuddyPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl NamedAllocator for BuddyPool {
    fn allocate(&mut self, name: &str, size: usize) -> AllocResult<BlockHandle> {
        BuddyPool::allocate(self, name, size)
    }

    fn deallocate(&mut self, name: &str) -> AllocResult {
        BuddyPool::deallocate(self, name)
    }

    fn query(&self, name: &str) -> Option<BlockInfo> {
        BuddyPool::query(self, name)
    }

    fn total_bytes(&self) -> usize {
        BuddyPool::total_bytes(self)
    }

    fn used_bytes(&self) -> usize {
        BuddyPool::used_bytes(self)
    }

    fn available_bytes(&self) -> usize {
        BuddyPool::available_bytes(self)
    }
}

impl fmt::Display for BuddyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "pool of {} bytes in {} units of {} bytes",
            self.pool_size(),
            self.units(),
            self.min_chunk_size()
        )?;
        for (_, block) in self.table.iter() {
            write!(
                f,
                "  [{}, {}) order {}, {} bytes: ",
                block.start_unit,
                block.end_unit(),
                block.order,
                self.config.block_size(block.order)
            )?;
            match &block.owner {
                None => writeln!(f, "free")?,
                Some(record) => writeln!(
                    f,
                    "{} ({} bytes requested)",
                    record.name, record.requested_size
                )?,
            }
        }
        Ok(())
    }
}
