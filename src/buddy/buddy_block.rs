//! Buddy block metadata
//!
//! Represents a block of the pool in the buddy system with order and unit
//! address information, plus the owned copies handed out to callers.

use alloc::string::String;

use super::process::ProcessRecord;

/// Stable index of a block record inside the block table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Calculate the buddy start unit of a block.
///
/// The buddy is the other half of the parent block at the next higher order.
/// For a block at order k starting at unit U, its buddy starts at U ^ 2^k.
#[inline]
pub const fn buddy_start(start_unit: usize, order: usize) -> usize {
    start_unit ^ (1 << order)
}

/// Buddy block record owned by the block table
#[derive(Debug, Clone)]
pub struct Block {
    pub start_unit: usize,
    pub order: usize,
    pub owner: Option<ProcessRecord>,
    /// Free-list links, meaningful only while the block is free
    pub(crate) prev_free: Option<BlockId>,
    pub(crate) next_free: Option<BlockId>,
}

impl Block {
    /// Create a new free block
    pub const fn free(start_unit: usize, order: usize) -> Self {
        Self {
            start_unit,
            order,
            owner: None,
            prev_free: None,
            next_free: None,
        }
    }

    pub const fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    /// Number of units covered by this block
    pub const fn units(&self) -> usize {
        1 << self.order
    }

    /// One past the last unit covered by this block
    pub const fn end_unit(&self) -> usize {
        self.start_unit + self.units()
    }

    pub const fn buddy_start(&self) -> usize {
        buddy_start(self.start_unit, self.order)
    }

    pub const fn covers(&self, unit: usize) -> bool {
        unit >= self.start_unit && unit < self.end_unit()
    }

    /// Build the caller-facing copy of this block.
    pub(crate) fn info(&self, min_chunk_size: usize) -> BlockInfo {
        let state = match &self.owner {
            None => BlockState::Free,
            Some(record) => BlockState::Occupied {
                name: record.name.clone(),
                requested_size: record.requested_size,
            },
        };
        BlockInfo {
            start_unit: self.start_unit,
            order: self.order,
            size_bytes: min_chunk_size << self.order,
            state,
        }
    }

    pub(crate) const fn handle(&self, min_chunk_size: usize) -> BlockHandle {
        BlockHandle {
            start_unit: self.start_unit,
            order: self.order,
            size_bytes: min_chunk_size << self.order,
        }
    }
}

/// Location of an allocated block, as returned by `allocate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub start_unit: usize,
    pub order: usize,
    /// Block size in bytes; may exceed the requested size.
    pub size_bytes: usize,
}

impl BlockHandle {
    pub const fn units(&self) -> usize {
        1 << self.order
    }

    pub const fn end_unit(&self) -> usize {
        self.start_unit + self.units()
    }

    /// Byte offset of the block from the start of the pool.
    pub const fn offset(&self, min_chunk_size: usize) -> usize {
        self.start_unit * min_chunk_size
    }
}

/// Whether a block is a hole or held by a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockState {
    Free,
    Occupied { name: String, requested_size: usize },
}

/// Owned snapshot of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub start_unit: usize,
    pub order: usize,
    pub size_bytes: usize,
    pub state: BlockState,
}

impl BlockInfo {
    pub fn is_free(&self) -> bool {
        matches!(self.state, BlockState::Free)
    }

    /// Name of the owning process, if any.
    pub fn name(&self) -> Option<&str> {
        match &self.state {
            BlockState::Free => None,
            BlockState::Occupied { name, .. } => Some(name.as_str()),
        }
    }

    /// Size originally requested by the owner, if any.
    pub fn requested_size(&self) -> Option<usize> {
        match self.state {
            BlockState::Free => None,
            BlockState::Occupied { requested_size, .. } => Some(requested_size),
        }
    }

    pub const fn end_unit(&self) -> usize {
        self.start_unit + (1 << self.order)
    }

    pub const fn handle(&self) -> BlockHandle {
        BlockHandle {
            start_unit: self.start_unit,
            order: self.order,
            size_bytes: self.size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_buddy_start() {
        assert_eq!(buddy_start(0, 0), 1);
        assert_eq!(buddy_start(1, 0), 0);
        assert_eq!(buddy_start(0, 2), 4);
        assert_eq!(buddy_start(4, 2), 0);
        assert_eq!(buddy_start(8, 3), 0);
        assert_eq!(buddy_start(12, 2), 8);
    }

    #[test]
    fn test_block_span() {
        let block = Block::free(4, 2);
        assert!(block.is_free());
        assert_eq!(block.units(), 4);
        assert_eq!(block.end_unit(), 8);
        assert!(block.covers(4));
        assert!(block.covers(7));
        assert!(!block.covers(8));
        assert!(!block.covers(3));
        assert_eq!(block.buddy_start(), 0);
    }

    #[test]
    fn test_block_info_copies_owner() {
        let mut block = Block::free(2, 1);
        block.owner = Some(ProcessRecord::new("P1".to_string(), 100, BlockId(3)));

        let info = block.info(64);
        assert_eq!(info.size_bytes, 128);
        assert_eq!(info.name(), Some("P1"));
        assert_eq!(info.requested_size(), Some(100));
        assert!(!info.is_free());
        assert_eq!(info.end_unit(), 4);

        let handle = block.handle(64);
        assert_eq!(handle, info.handle());
        assert_eq!(handle.offset(64), 128);
    }
}
