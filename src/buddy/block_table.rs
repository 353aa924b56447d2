//! Block table for the buddy pool
//!
//! Owns every live block record in a single arena. Records are addressed by
//! [`BlockId`], and vacant arena slots are chained into a free list and
//! recycled, so ids stay stable for as long as a block lives.
//!
//! Two ordered indices sit next to the arena: start unit -> block and
//! process name -> block.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use super::buddy_block::{Block, BlockId};

enum Slot {
    Occupied(Block),
    Vacant { next: Option<usize> },
}

/// Arena of live blocks with address and name indices
pub struct BlockTable {
    slots: Vec<Slot>,
    /// Head of the vacant slot chain
    free_head: Option<usize>,
    live: usize,
    by_start: BTreeMap<usize, BlockId>,
    by_name: BTreeMap<String, BlockId>,
    total_inserts: usize,
    total_removals: usize,
}

impl BlockTable {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            live: 0,
            by_start: BTreeMap::new(),
            by_name: BTreeMap::new(),
            total_inserts: 0,
            total_removals: 0,
        }
    }

    /// Drop every block and name, keeping the arena allocation.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.live = 0;
        self.by_start.clear();
        self.by_name.clear();
    }

    /// Insert a block record and index it by its start unit.
    pub fn insert(&mut self, block: Block) -> BlockId {
        let start = block.start_unit;
        let id = match self.free_head {
            Some(idx) => {
                let next = match self.slots[idx] {
                    Slot::Vacant { next } => next,
                    Slot::Occupied(_) => panic!("vacant chain points at live slot {}", idx),
                };
                self.free_head = next;
                self.slots[idx] = Slot::Occupied(block);
                BlockId(idx)
            }
            None => {
                self.slots.push(Slot::Occupied(block));
                BlockId(self.slots.len() - 1)
            }
        };

        let previous = self.by_start.insert(start, id);
        debug_assert!(previous.is_none(), "two blocks start at unit {}", start);

        self.live += 1;
        self.total_inserts += 1;
        id
    }

    /// Remove a block record, returning it if the id was live.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let slot = self.slots.get_mut(id.0)?;
        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }

        let old = core::mem::replace(
            slot,
            Slot::Vacant {
                next: self.free_head,
            },
        );
        self.free_head = Some(id.0);

        let Slot::Occupied(block) = old else {
            unreachable!()
        };
        self.by_start.remove(&block.start_unit);
        if let Some(record) = &block.owner {
            self.by_name.remove(&record.name);
        }

        self.live -= 1;
        self.total_removals += 1;
        Some(block)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        match self.slots.get(id.0) {
            Some(Slot::Occupied(block)) => Some(block),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        match self.slots.get_mut(id.0) {
            Some(Slot::Occupied(block)) => Some(block),
            _ => None,
        }
    }

    /// Find the block starting exactly at `unit`.
    pub fn find_by_start(&self, unit: usize) -> Option<BlockId> {
        self.by_start.get(&unit).copied()
    }

    /// Find the block whose span covers `unit`.
    pub fn find_covering(&self, unit: usize) -> Option<BlockId> {
        let (_, &id) = self.by_start.range(..=unit).next_back()?;
        self.get(id)
            .filter(|block| block.covers(unit))
            .map(|_| id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Register `name` as the owner of `id`.
    pub fn bind_name(&mut self, name: String, id: BlockId) {
        let previous = self.by_name.insert(name, id);
        debug_assert!(previous.is_none(), "process name bound twice");
    }

    pub fn unbind_name(&mut self, name: &str) -> Option<BlockId> {
        self.by_name.remove(name)
    }

    /// Move a block to a new start unit, keeping its id.
    pub fn move_start(&mut self, id: BlockId, new_start: usize) {
        let old_start = self[id].start_unit;
        if old_start == new_start {
            return;
        }
        self.by_start.remove(&old_start);
        let previous = self.by_start.insert(new_start, id);
        debug_assert!(previous.is_none(), "two blocks start at unit {}", new_start);
        self[id].start_unit = new_start;
    }

    /// Iterate live blocks in ascending start-unit order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> + '_ {
        self.by_start.values().map(move |&id| (id, &self[id]))
    }

    /// Number of live blocks
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of registered process names
    pub fn name_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn get_stats(&self) -> BlockTableStats {
        BlockTableStats {
            live_blocks: self.live,
            arena_slots: self.slots.len(),
            total_inserts: self.total_inserts,
            total_removals: self.total_removals,
        }
    }
}

impl Default for BlockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<BlockId> for BlockTable {
    type Output = Block;

    fn index(&self, id: BlockId) -> &Block {
        match self.get(id) {
            Some(block) => block,
            None => panic!("block table: stale block id {}", id.0),
        }
    }
}

impl IndexMut<BlockId> for BlockTable {
    fn index_mut(&mut self, id: BlockId) -> &mut Block {
        match self.get_mut(id) {
            Some(block) => block,
            None => panic!("block table: stale block id {}", id.0),
        }
    }
}

/// Block table statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockTableStats {
    pub live_blocks: usize,
    /// Arena slots, live or vacant
    pub arena_slots: usize,
    pub total_inserts: usize,
    pub total_removals: usize,
}
