//! The allocator core: size resolution, pool service, and the heap fallback.

use std::alloc::{handle_alloc_error, Layout};
use std::ptr::{self, NonNull};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::block::{BlockHeader, Owner};
use crate::config::{AllocatorConfig, PoolMode};
use crate::constants::BLOCK_ALIGN;
use crate::error::AllocError;
use crate::handle::BlockHandle;
use crate::observer::{AllocEvent, AllocObserver, NoOpObserver};
use crate::oversize;
use crate::pool::{Pool, Served};
use crate::registry::PoolRegistry;
use crate::stats::{AllocatorStats, AtomicAllocStats};

/// Fixed-block allocator.
///
/// Requests are rounded up to the smallest configured block size that holds them
/// and served from that class's pool. Freed blocks go back onto their pool's free
/// list and are only ever reused by the same class. Requests larger than the
/// largest class go to the system heap.
///
/// The allocator is `Send + Sync`; each pool is guarded by its own lock.
/// Dropping the allocator releases all pool memory, so every pooled pointer it
/// handed out becomes dangling. Heap fallback blocks still live at that point
/// are leaked.
pub struct Allocator {
    config: AllocatorConfig,
    registry: PoolRegistry,
    stats: AtomicAllocStats,
    observer: Arc<dyn AllocObserver>,
}

impl Allocator {
    /// Build an allocator. Static pools are reserved immediately.
    pub fn new(config: AllocatorConfig) -> Result<Self, AllocError> {
        Self::with_observer(config, Arc::new(NoOpObserver::new()))
    }

    /// Build an allocator that reports every operation to `observer`.
    pub fn with_observer(
        config: AllocatorConfig,
        observer: Arc<dyn AllocObserver>,
    ) -> Result<Self, AllocError> {
        let config = config.normalize();
        config.validate()?;
        let registry = PoolRegistry::new(&config)?;
        debug!(
            mode = config.mode.name(),
            classes = config.block_sizes.len(),
            max_block_size = config.max_block_size(),
            "Allocator initialized"
        );
        if let PoolMode::StaticPools { .. } = config.mode {
            for &block_size in registry.sizes() {
                debug!(block_size, "Pool created");
                observer.on_event(&AllocEvent::PoolCreated { block_size });
            }
        }
        Ok(Self {
            config,
            registry,
            stats: AtomicAllocStats::new(),
            observer,
        })
    }

    /// Allocate at least `size` bytes.
    ///
    /// The memory is uninitialized and aligned to [`BLOCK_ALIGN`]. A zero-byte request
    /// is served from the smallest class.
    pub fn allocate(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let Some(id) = self.registry.resolve(size.max(1)) else {
            return self.allocate_oversize(size);
        };
        let (acquired, created) = self.registry.with_pool(id, Pool::acquire)?;
        let block_size = self.registry.block_size(id).unwrap_or(size);
        if created {
            debug!(block_size, "Pool created");
            self.observer.on_event(&AllocEvent::PoolCreated { block_size });
        }
        match acquired {
            Ok((ptr, Served::Reused)) => {
                self.observer.on_event(&AllocEvent::Reused { block_size });
                Ok(ptr)
            }
            Ok((ptr, Served::Minted { total })) => {
                self.observer
                    .on_event(&AllocEvent::Minted { block_size, total });
                Ok(ptr)
            }
            Err(AllocError::PoolExhausted {
                block_size,
                capacity,
            }) => {
                let spill = matches!(
                    self.config.mode,
                    PoolMode::StaticPools {
                        spill_to_heap: true,
                        ..
                    }
                );
                warn!(block_size, capacity, spill, "Static pool exhausted");
                self.stats.record_exhaustion();
                self.observer.on_event(&AllocEvent::Exhausted {
                    block_size,
                    capacity,
                });
                if spill {
                    return self.allocate_oversize(size);
                }
                Err(AllocError::PoolExhausted {
                    block_size,
                    capacity,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn allocate_oversize(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = oversize::allocate(size)?;
        self.stats.record_oversize_allocation();
        self.observer.on_event(&AllocEvent::Oversize { size });
        Ok(ptr)
    }

    /// Allocate `size` bytes and zero them.
    pub fn allocate_zeroed(&self, size: usize) -> Result<NonNull<u8>, AllocError> {
        let ptr = self.allocate(size)?;
        // SAFETY: the block holds at least `size` writable bytes.
        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    /// Allocate `size` bytes, handing out-of-memory to [`handle_alloc_error`].
    pub fn allocate_or_abort(&self, size: usize) -> NonNull<u8> {
        match self.allocate(size) {
            Ok(ptr) => ptr,
            Err(_) => handle_alloc_error(
                Layout::from_size_align(size.max(1), BLOCK_ALIGN).unwrap_or(Layout::new::<u8>()),
            ),
        }
    }

    /// Allocate a zeroed block owned by the returned handle.
    pub fn alloc_block(&self, size: usize) -> Result<BlockHandle<'_>, AllocError> {
        let ptr = self.allocate_zeroed(size)?;
        // SAFETY: `ptr` was just allocated by `self` with `size` initialized bytes.
        Ok(unsafe { BlockHandle::from_raw(self, ptr, size) })
    }

    /// Return a block to its pool, or to the system heap for fallback blocks.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator and not freed since. Freeing a
    /// foreign pointer or freeing twice is undefined behavior; debug builds assert on it.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        let header = BlockHeader::from_payload(ptr);
        debug_assert!(
            BlockHeader::is_live(header),
            "deallocate of a block that is not live (double free or foreign pointer)"
        );
        match BlockHeader::owner(header) {
            Owner::Oversize => {
                let size = oversize::release(header);
                self.stats.record_oversize_deallocation();
                self.observer.on_event(&AllocEvent::OversizeReleased { size });
            }
            Owner::Pool(id) => {
                let returned = self
                    .registry
                    .with_existing(id, |pool| {
                        unsafe { pool.release(header) };
                        pool.block_size()
                    });
                debug_assert!(returned.is_some(), "block names a pool that does not exist");
                if let Some(block_size) = returned {
                    self.observer.on_event(&AllocEvent::Returned { block_size });
                }
            }
        }
    }

    /// Resize a block to hold `new_size` bytes.
    ///
    /// The same pointer comes back when the block already holds `new_size` bytes.
    /// Otherwise the contents are copied into a new block and the old one is freed.
    /// On error the old block is untouched.
    ///
    /// # Safety
    ///
    /// Same contract as [`Allocator::deallocate`].
    pub unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        new_size: usize,
    ) -> Result<NonNull<u8>, AllocError> {
        let capacity = self.usable_size(ptr);
        if new_size <= capacity {
            return Ok(ptr);
        }
        let fresh = self.allocate(new_size)?;
        ptr::copy_nonoverlapping(ptr.as_ptr(), fresh.as_ptr(), capacity);
        self.deallocate(ptr);
        Ok(fresh)
    }

    /// Usable bytes of the block behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live block returned by this allocator.
    pub unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        BlockHeader::extent(BlockHeader::from_payload(ptr))
    }

    /// Pre-mint blocks so the class serving `size` has at least `count` free blocks.
    /// Returns the number of blocks minted; static pools and oversize requests mint none.
    pub fn warm(&self, size: usize, count: usize) -> Result<usize, AllocError> {
        let Some(id) = self.registry.resolve(size.max(1)) else {
            return Ok(0);
        };
        let (warmed, created) = self.registry.with_pool(id, |pool| {
            let before = pool.stats().minted;
            pool.warm(count).map(|added| (added, before))
        })?;
        let (added, before) = warmed?;
        let block_size = self.registry.block_size(id).unwrap_or(size);
        if created {
            debug!(block_size, "Pool created");
            self.observer.on_event(&AllocEvent::PoolCreated { block_size });
        }
        for total in before + 1..=before + added {
            self.observer
                .on_event(&AllocEvent::Minted { block_size, total });
        }
        if added > 0 {
            debug!(block_size, added, "Pool warmed");
        }
        Ok(added)
    }

    /// Put every pooled block back on its free list. Heap fallback blocks are untouched.
    ///
    /// # Safety
    ///
    /// No pooled block handed out by this allocator may be used afterwards.
    pub unsafe fn reset(&self) {
        self.registry.for_each(|pool| unsafe { pool.reset() });
        debug!("Pools reset");
    }

    /// Zero all counters. Pool contents are unchanged.
    pub fn reset_stats(&self) {
        self.registry.for_each(Pool::reset_counters);
        self.stats.reset();
    }

    /// Snapshot of every pool and the allocator-wide counters.
    #[must_use]
    pub fn stats(&self) -> AllocatorStats {
        let counters = self.stats.snapshot();
        AllocatorStats {
            mode: self.config.mode.name(),
            pools: self.registry.snapshot(),
            oversize_allocations: counters.oversize_allocations,
            oversize_deallocations: counters.oversize_deallocations,
            exhaustions: counters.exhaustions,
        }
    }

    /// Block size that would serve a request of `size` bytes, or `None` for the heap fallback.
    #[must_use]
    pub fn block_size_for(&self, size: usize) -> Option<usize> {
        self.registry
            .resolve(size.max(1))
            .and_then(|id| self.registry.block_size(id))
    }

    /// The normalized configuration in effect.
    #[must_use]
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Operating mode.
    #[must_use]
    pub fn mode(&self) -> PoolMode {
        self.config.mode
    }
}

impl std::fmt::Debug for Allocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
