//! Pool registry: one slot per configured size class.
//!
//! Slots are indexed by the class's position in the sorted menu, so a [`PoolId`]
//! stays valid for the registry's lifetime even when pools are created lazily.
//! Each slot has its own lock; requests for different classes never contend.

use parking_lot::Mutex;

use crate::block::PoolId;
use crate::config::{AllocatorConfig, PoolMode};
use crate::error::AllocError;
use crate::pool::Pool;
use crate::stats::PoolStats;

pub(crate) struct PoolRegistry {
    sizes: Box<[usize]>,
    slots: Box<[Mutex<Option<Pool>>]>,
}

impl PoolRegistry {
    /// Build the registry. Static pools are reserved here; heap-block pools are
    /// created on first use.
    pub(crate) fn new(config: &AllocatorConfig) -> Result<Self, AllocError> {
        let sizes: Box<[usize]> = config.block_sizes.clone().into_boxed_slice();
        let slots = sizes
            .iter()
            .enumerate()
            .map(|(index, &block_size)| match config.mode {
                PoolMode::HeapBlocks => Ok(Mutex::new(None)),
                PoolMode::StaticPools { max_blocks, .. } => {
                    Pool::with_static_region(PoolId::new(index), block_size, max_blocks)
                        .map(|pool| Mutex::new(Some(pool)))
                }
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_boxed_slice();
        Ok(Self { sizes, slots })
    }

    /// Smallest class whose usable size holds `size` bytes.
    pub(crate) fn resolve(&self, size: usize) -> Option<PoolId> {
        let index = self.sizes.partition_point(|&class| class < size);
        (index < self.sizes.len()).then(|| PoolId::new(index))
    }

    pub(crate) fn block_size(&self, id: PoolId) -> Option<usize> {
        self.sizes.get(id.index()).copied()
    }

    pub(crate) fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Run `f` on the pool for `id`, creating it first if needed.
    /// The flag reports whether the pool was created by this call.
    pub(crate) fn with_pool<R>(
        &self,
        id: PoolId,
        f: impl FnOnce(&mut Pool) -> R,
    ) -> Result<(R, bool), AllocError> {
        let slot = &self.slots[id.index()];
        let mut guard = slot.lock();
        let created = guard.is_none();
        let pool = match guard.take() {
            Some(pool) => pool,
            None => Pool::with_heap_blocks(id, self.sizes[id.index()])?,
        };
        Ok((f(guard.insert(pool)), created))
    }

    /// Run `f` on the pool for `id` if it exists.
    pub(crate) fn with_existing<R>(&self, id: PoolId, f: impl FnOnce(&mut Pool) -> R) -> Option<R> {
        let slot = self.slots.get(id.index())?;
        slot.lock().as_mut().map(f)
    }

    /// Run `f` on every existing pool, smallest class first.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&mut Pool)) {
        for slot in &*self.slots {
            if let Some(pool) = slot.lock().as_mut() {
                f(pool);
            }
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<PoolStats> {
        let mut pools = Vec::new();
        for slot in &*self.slots {
            if let Some(pool) = slot.lock().as_ref() {
                pools.push(pool.stats());
            }
        }
        pools
    }
}
