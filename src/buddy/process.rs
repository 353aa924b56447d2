//! Process descriptor attached to occupied blocks

use alloc::string::String;

use super::buddy_block::BlockId;

/// A resident process: its name, the size it asked for, and the block it
/// was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub name: String,
    pub requested_size: usize,
    pub block: BlockId,
}

impl ProcessRecord {
    pub fn new(name: String, requested_size: usize, block: BlockId) -> Self {
        Self {
            name,
            requested_size,
            block,
        }
    }
}
