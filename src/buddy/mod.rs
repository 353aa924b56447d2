//! Buddy pool module
//!
//! This module provides a complete buddy system implementation with:
//! - Arena-backed block table with address and name indices
//! - Intrusive per-order free lists
//! - Split on allocate, coalesce on deallocate
//! - Usage statistics and failure reporting (`tracking`)

pub mod block_table;
pub mod buddy_block;
pub mod buddy_pool;
pub mod free_list;
pub mod process;
#[cfg(feature = "tracking")]
pub mod stats;

pub use block_table::{BlockTable, BlockTableStats};
pub use buddy_block::{buddy_start, Block, BlockHandle, BlockId, BlockInfo, BlockState};
pub use buddy_pool::{BuddyPool, InvariantViolation};
pub use free_list::FreeListIndex;
pub use process::ProcessRecord;
#[cfg(feature = "tracking")]
pub use stats::{MemoryStatsReporter, PoolStats};
