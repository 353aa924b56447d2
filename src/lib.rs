//! Buddy Pool
//!
//! A binary buddy allocator that manages a fixed-size, power-of-two memory
//! pool on behalf of named client allocations ("processes"), featuring:
//! - Arena-backed block table with address and name lookup
//! - Order-indexed free lists for O(orders) allocation search
//! - XOR-derived buddy addressing and recursive coalescing
//! - Optional usage statistics (`tracking`) and logging (`log`)
//! - A spin-locked wrapper for multi-caller drivers

#![no_std]

extern crate alloc;

use core::fmt;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// The error type used for pool construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Pool size or minimum chunk size is not a power of two (zero included).
    NotPowerOfTwo,
    /// Minimum chunk size is larger than the pool itself.
    ChunkExceedsPool,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPowerOfTwo => f.write_str("pool and chunk sizes must be powers of two"),
            Self::ChunkExceedsPool => f.write_str("minimum chunk size exceeds pool size"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// The error type used for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// A process with the same name is already resident.
    DuplicateName,
    /// Zero-sized request, or a request larger than the whole pool.
    InvalidSize,
    /// No free block of sufficient order exists.
    OutOfMemory,
    /// No resident process has the given name.
    NotFound,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName => f.write_str("process name already resident"),
            Self::InvalidSize => f.write_str("requested size cannot be served by this pool"),
            Self::OutOfMemory => f.write_str("no free block large enough"),
            Self::NotFound => f.write_str("no such process"),
        }
    }
}

impl core::error::Error for AllocError {}

/// A [`Result`] type with [`AllocError`] as the error type.
pub type AllocResult<T = ()> = Result<T, AllocError>;

/// A [`Result`] type with [`ConfigError`] as the error type.
pub type ConfigResult<T = ()> = Result<T, ConfigError>;

/// Allocator that hands out memory to processes identified by name.
pub trait NamedAllocator {
    /// Allocate at least `size` bytes for the process `name`.
    fn allocate(&mut self, name: &str, size: usize) -> AllocResult<BlockHandle>;

    /// Release the memory held by the process `name`.
    fn deallocate(&mut self, name: &str) -> AllocResult;

    /// Look up the block held by the process `name`.
    fn query(&self, name: &str) -> Option<BlockInfo>;

    /// Returns total memory size in bytes.
    fn total_bytes(&self) -> usize;

    /// Returns allocated memory size in bytes.
    fn used_bytes(&self) -> usize;

    /// Returns available memory size in bytes.
    fn available_bytes(&self) -> usize;
}

/// Smallest order `k` with `2^k` units covering `units` units.
///
/// Returns `None` when the rounded-up count does not fit in a `usize`.
#[inline]
const fn order_for_units(units: usize) -> Option<usize> {
    match units.checked_next_power_of_two() {
        Some(p) => Some(p.trailing_zeros() as usize),
        None => None,
    }
}

/// Checks whether the unit index has the alignment of a block of `order`.
///
/// Equivalent to `unit % (1 << order) == 0`.
#[inline]
const fn is_aligned(unit: usize, order: usize) -> bool {
    unit & ((1 << order) - 1) == 0
}

pub mod config;
pub use config::{PoolConfig, DEFAULT_MIN_CHUNK_SIZE, DEFAULT_POOL_SIZE};

pub mod buddy;
#[cfg(feature = "tracking")]
pub use buddy::PoolStats;
pub use buddy::{BlockHandle, BlockInfo, BlockState, BuddyPool, InvariantViolation};

pub mod locked_pool;
pub use locked_pool::LockedBuddyPool;
