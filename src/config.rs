//! Pool configuration
//!
//! Validates the pool geometry once, at construction, so the allocator can
//! rely on power-of-two sizes everywhere else.

use crate::{ConfigError, ConfigResult};

/// Default pool size in bytes.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Default minimum chunk size in bytes.
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 64;

/// Validated pool geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pool_size: usize,
    min_chunk_size: usize,
}

impl PoolConfig {
    /// Create a configuration, checking that both sizes are powers of two
    /// and that a single chunk fits in the pool.
    pub const fn new(pool_size: usize, min_chunk_size: usize) -> ConfigResult<Self> {
        if !pool_size.is_power_of_two() || !min_chunk_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo);
        }
        if min_chunk_size > pool_size {
            return Err(ConfigError::ChunkExceedsPool);
        }
        Ok(Self {
            pool_size,
            min_chunk_size,
        })
    }

    /// Pool size in bytes.
    pub const fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Minimum chunk (unit) size in bytes.
    pub const fn min_chunk_size(&self) -> usize {
        self.min_chunk_size
    }

    /// Number of addressable units in the pool.
    pub const fn units(&self) -> usize {
        self.pool_size / self.min_chunk_size
    }

    /// Order of the root block covering the whole pool.
    pub const fn max_order(&self) -> usize {
        self.units().trailing_zeros() as usize
    }

    /// Size in bytes of a block of the given order.
    pub const fn block_size(&self, order: usize) -> usize {
        self.min_chunk_size << order
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
        }
    }
}
