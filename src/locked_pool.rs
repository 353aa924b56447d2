//! Locked buddy pool
//!
//! Split and merge touch several free lists per call, so a pool shared by
//! more than one driver is guarded as a whole by a single spin lock.

use alloc::vec::Vec;

use kspin::{SpinNoIrq, SpinNoIrqGuard};

#[cfg(feature = "tracking")]
use crate::buddy::PoolStats;
use crate::buddy::{BlockHandle, BlockInfo, BuddyPool};
use crate::config::PoolConfig;
use crate::{AllocResult, ConfigResult};

/// A [`BuddyPool`] behind one exclusive lock
pub struct LockedBuddyPool {
    inner: SpinNoIrq<BuddyPool>,
}

impl LockedBuddyPool {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            inner: SpinNoIrq::new(BuddyPool::new(config)),
        }
    }

    /// Validate the geometry and create the pool.
    pub fn init(pool_size: usize, min_chunk_size: usize) -> ConfigResult<Self> {
        Ok(Self::new(PoolConfig::new(pool_size, min_chunk_size)?))
    }

    /// Lock the pool for a compound operation.
    pub fn lock(&self) -> SpinNoIrqGuard<'_, BuddyPool> {
        self.inner.lock()
    }

    pub fn allocate(&self, name: &str, size: usize) -> AllocResult<BlockHandle> {
        self.inner.lock().allocate(name, size)
    }

    pub fn deallocate(&self, name: &str) -> AllocResult {
        self.inner.lock().deallocate(name)
    }

    pub fn query(&self, name: &str) -> Option<BlockInfo> {
        self.inner.lock().query(name)
    }

    pub fn snapshot(&self) -> Vec<BlockInfo> {
        self.inner.lock().snapshot()
    }

    pub fn processes(&self) -> Vec<BlockInfo> {
        self.inner.lock().processes()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes()
    }

    pub fn used_bytes(&self) -> usize {
        self.inner.lock().used_bytes()
    }

    pub fn available_bytes(&self) -> usize {
        self.inner.lock().available_bytes()
    }

    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> PoolStats {
        self.inner.lock().get_stats()
    }

    /// Consume the wrapper and return the pool.
    pub fn into_inner(self) -> BuddyPool {
        self.inner.into_inner()
    }
}

impl Default for LockedBuddyPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl From<BuddyPool> for LockedBuddyPool {
    fn from(pool: BuddyPool) -> Self {
        Self {
            inner: SpinNoIrq::new(pool),
        }
    }
}
