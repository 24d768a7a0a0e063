//! A single size class: same-sized blocks and their free list.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::block::{region_layout, stride_for, BlockHeader, FreeList, Owner, PoolId};
use crate::constants::MINT_BATCH_MAX;
use crate::error::AllocError;
use crate::stats::PoolStats;

/// One region reserved from the system heap. Blocks are carved from the front;
/// only the first `carved` of `capacity` blocks have ever been handed to the pool.
struct Chunk {
    base: NonNull<u8>,
    layout: Layout,
    capacity: usize,
    carved: usize,
}

impl Chunk {
    fn has_room(&self) -> bool {
        self.carved < self.capacity
    }
}

/// How a block was obtained by [`Pool::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Served {
    /// Popped off the free list.
    Reused,
    /// Minted from the system heap; `total` is the pool's mint count afterwards.
    Minted { total: usize },
}

/// Pool of blocks sharing one usable size.
pub(crate) struct Pool {
    id: PoolId,
    block_size: usize,
    stride: usize,
    capacity: Option<usize>,
    free: FreeList,
    chunks: Vec<Chunk>,
    minted: usize,
    allocations: u64,
    deallocations: u64,
    hits: u64,
    misses: u64,
}

// SAFETY: a pool exclusively owns the memory behind its raw pointers, and the
// registry only hands out `&mut Pool` under a mutex.
unsafe impl Send for Pool {}

impl Pool {
    fn empty(id: PoolId, block_size: usize, capacity: Option<usize>) -> Result<Self, AllocError> {
        let stride = stride_for(block_size).ok_or(AllocError::SizeOverflow {
            requested: block_size,
        })?;
        Ok(Self {
            id,
            block_size,
            stride,
            capacity,
            free: FreeList::new(),
            chunks: Vec::new(),
            minted: 0,
            allocations: 0,
            deallocations: 0,
            hits: 0,
            misses: 0,
        })
    }

    /// Empty pool that mints blocks on demand.
    pub(crate) fn with_heap_blocks(id: PoolId, block_size: usize) -> Result<Self, AllocError> {
        Self::empty(id, block_size, None)
    }

    /// Pool backed by one contiguous region of `max_blocks` blocks, all free.
    pub(crate) fn with_static_region(
        id: PoolId,
        block_size: usize,
        max_blocks: usize,
    ) -> Result<Self, AllocError> {
        let mut pool = Self::empty(id, block_size, Some(max_blocks))?;
        pool.grow(max_blocks)?;
        Ok(pool)
    }

    pub(crate) fn block_size(&self) -> usize {
        self.block_size
    }

    #[cfg(test)]
    pub(crate) fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Reserve a chunk of `count` blocks and put them all on the free list.
    fn grow(&mut self, count: usize) -> Result<(), AllocError> {
        let base = self.reserve(count)?;
        if let Some(chunk) = self.chunks.last_mut() {
            chunk.carved = count;
        }
        for i in 0..count {
            // SAFETY: `base` spans `count * stride` fresh bytes aligned to BLOCK_ALIGN,
            // and `stride` is a multiple of BLOCK_ALIGN.
            unsafe {
                let header = base.as_ptr().add(i * self.stride).cast::<BlockHeader>();
                let header = NonNull::new_unchecked(header);
                BlockHeader::init(header, Owner::Pool(self.id), self.block_size);
                self.free.push(header);
            }
        }
        self.minted += count;
        Ok(())
    }

    /// Mint one block for immediate use. It is not put on the free list.
    ///
    /// Blocks are carved from the newest chunk. When it is full a new chunk is
    /// reserved, sized to the current mint count so the number of chunks grows
    /// logarithmically until batches reach [`MINT_BATCH_MAX`].
    fn mint(&mut self) -> Result<NonNull<BlockHeader>, AllocError> {
        if !self.chunks.last().is_some_and(Chunk::has_room) {
            self.reserve(self.minted.clamp(1, MINT_BATCH_MAX))?;
        }
        let stride = self.stride;
        let chunk = match self.chunks.last_mut() {
            Some(chunk) if chunk.has_room() => chunk,
            _ => return Err(AllocError::HeapExhausted { bytes: stride }),
        };
        // SAFETY: `carved < capacity`, so the block lies inside the chunk, and both the
        // chunk base and `stride` are multiples of BLOCK_ALIGN.
        let header = unsafe {
            let header = chunk.base.as_ptr().add(chunk.carved * stride).cast::<BlockHeader>();
            NonNull::new_unchecked(header)
        };
        chunk.carved += 1;
        // SAFETY: fresh block of `stride` bytes aligned to BLOCK_ALIGN.
        unsafe { BlockHeader::init(header, Owner::Pool(self.id), self.block_size) };
        self.minted += 1;
        Ok(header)
    }

    /// Reserve room for `count` blocks as a new chunk with nothing carved yet.
    fn reserve(&mut self, count: usize) -> Result<NonNull<u8>, AllocError> {
        let layout = region_layout(self.block_size, count).ok_or(AllocError::SizeOverflow {
            requested: self.block_size,
        })?;
        self.chunks
            .try_reserve(1)
            .map_err(|_| AllocError::HeapExhausted {
                bytes: layout.size(),
            })?;
        // SAFETY: `layout` has non-zero size since every block carries a header.
        let raw = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(raw).ok_or(AllocError::HeapExhausted {
            bytes: layout.size(),
        })?;
        self.chunks.push(Chunk {
            base,
            layout,
            capacity: count,
            carved: 0,
        });
        Ok(base)
    }

    /// Hand out one block: free list first, then mint (heap blocks) or fail (static).
    pub(crate) fn acquire(&mut self) -> Result<(NonNull<u8>, Served), AllocError> {
        let (block, served) = if let Some(block) = self.free.pop() {
            self.hits += 1;
            (block, Served::Reused)
        } else if let Some(capacity) = self.capacity {
            return Err(AllocError::PoolExhausted {
                block_size: self.block_size,
                capacity,
            });
        } else {
            let block = self.mint()?;
            self.misses += 1;
            (
                block,
                Served::Minted {
                    total: self.minted,
                },
            )
        };
        self.allocations += 1;
        // SAFETY: `block` belongs to this pool and was just taken off the free list or minted.
        unsafe {
            BlockHeader::mark_live(block);
            Ok((BlockHeader::payload(block), served))
        }
    }

    /// Put a block back on the free list.
    ///
    /// # Safety
    ///
    /// `block` must have been handed out by `acquire` on this pool and not released since.
    pub(crate) unsafe fn release(&mut self, block: NonNull<BlockHeader>) {
        debug_assert_eq!(BlockHeader::owner(block), Owner::Pool(self.id));
        self.free.push(block);
        self.deallocations += 1;
    }

    /// Mint blocks until at least `count` are free. Static pools never grow.
    /// Returns the number of blocks minted.
    pub(crate) fn warm(&mut self, count: usize) -> Result<usize, AllocError> {
        if self.capacity.is_some() {
            return Ok(0);
        }
        let to_add = count.saturating_sub(self.free.len());
        if to_add > 0 {
            self.grow(to_add)?;
        }
        Ok(to_add)
    }

    /// Put every minted block back on the free list.
    ///
    /// # Safety
    ///
    /// No block of this pool may still be in use by a caller.
    pub(crate) unsafe fn reset(&mut self) {
        self.free.clear();
        for chunk in &self.chunks {
            for i in 0..chunk.carved {
                let header = chunk.base.as_ptr().add(i * self.stride).cast::<BlockHeader>();
                let header = NonNull::new_unchecked(header);
                BlockHeader::init(header, Owner::Pool(self.id), self.block_size);
                self.free.push(header);
            }
        }
    }

    pub(crate) fn reset_counters(&mut self) {
        self.allocations = 0;
        self.deallocations = 0;
        self.hits = 0;
        self.misses = 0;
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            block_size: self.block_size,
            capacity: self.capacity,
            minted: self.minted,
            free: self.free.len(),
            in_use: self.minted - self.free.len(),
            allocations: self.allocations,
            deallocations: self.deallocations,
            hits: self.hits,
            misses: self.misses,
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.free.clear();
        for chunk in self.chunks.drain(..) {
            // SAFETY: every chunk was obtained from `alloc::alloc` with this layout.
            unsafe { alloc::dealloc(chunk.base.as_ptr(), chunk.layout) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BLOCK_ALIGN;

    fn heap_pool(block_size: usize) -> Pool {
        Pool::with_heap_blocks(PoolId::new(0), block_size).unwrap()
    }

    #[test]
    fn heap_pool_starts_empty() {
        let pool = heap_pool(32);
        let stats = pool.stats();
        assert_eq!(stats.minted, 0);
        assert_eq!(stats.free, 0);
        assert_eq!(stats.capacity, None);
    }

    #[test]
    fn first_acquire_mints_then_reuses() {
        let mut pool = heap_pool(32);
        let (ptr, served) = pool.acquire().unwrap();
        assert_eq!(served, Served::Minted { total: 1 });

        unsafe { pool.release(BlockHeader::from_payload(ptr)) };
        let (again, served) = pool.acquire().unwrap();
        assert_eq!(served, Served::Reused);
        assert_eq!(again, ptr);

        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.minted, 1);
        assert_eq!(stats.in_use, 1);
        unsafe { pool.release(BlockHeader::from_payload(again)) };
    }

    #[test]
    fn payloads_are_aligned_and_writable() {
        let mut pool = heap_pool(24);
        let mut ptrs = Vec::new();
        for i in 0..8u8 {
            let (ptr, _) = pool.acquire().unwrap();
            assert_eq!(ptr.as_ptr() as usize % BLOCK_ALIGN, 0);
            unsafe { std::ptr::write_bytes(ptr.as_ptr(), i, 24) };
            ptrs.push(ptr);
        }
        for (i, ptr) in ptrs.iter().enumerate() {
            let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 24) };
            assert!(bytes.iter().all(|&b| usize::from(b) == i));
        }
        for ptr in ptrs {
            unsafe { pool.release(BlockHeader::from_payload(ptr)) };
        }
        assert_eq!(pool.free_len(), 8);
    }

    #[test]
    fn static_pool_exhausts_at_capacity() {
        let mut pool = Pool::with_static_region(PoolId::new(0), 16, 2).unwrap();
        assert_eq!(pool.free_len(), 2);
        let (a, sa) = pool.acquire().unwrap();
        let (b, sb) = pool.acquire().unwrap();
        assert_eq!(sa, Served::Reused);
        assert_eq!(sb, Served::Reused);
        assert_ne!(a, b);
        assert_eq!(
            pool.acquire().unwrap_err(),
            AllocError::PoolExhausted {
                block_size: 16,
                capacity: 2
            }
        );
        unsafe { pool.release(BlockHeader::from_payload(a)) };
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn static_blocks_are_contiguous() {
        let mut pool = Pool::with_static_region(PoolId::new(0), 16, 3).unwrap();
        let mut addrs: Vec<usize> = (0..3)
            .map(|_| pool.acquire().unwrap().0.as_ptr() as usize)
            .collect();
        addrs.sort_unstable();
        let stride = stride_for(16).unwrap();
        assert_eq!(addrs[1] - addrs[0], stride);
        assert_eq!(addrs[2] - addrs[1], stride);
    }

    #[test]
    fn warm_tops_up_free_list() {
        let mut pool = heap_pool(64);
        assert_eq!(pool.warm(4).unwrap(), 4);
        assert_eq!(pool.free_len(), 4);
        assert_eq!(pool.warm(4).unwrap(), 0);
        assert_eq!(pool.warm(6).unwrap(), 2);
        assert_eq!(pool.stats().minted, 6);

        let (_, served) = pool.acquire().unwrap();
        assert_eq!(served, Served::Reused);
    }

    #[test]
    fn warm_is_noop_for_static_pools() {
        let mut pool = Pool::with_static_region(PoolId::new(0), 16, 2).unwrap();
        assert_eq!(pool.warm(10).unwrap(), 0);
        assert_eq!(pool.free_len(), 2);
    }

    #[test]
    fn reset_returns_every_block() {
        let mut pool = heap_pool(16);
        for _ in 0..5 {
            pool.acquire().unwrap();
        }
        pool.warm(7).unwrap();
        assert_eq!(pool.stats().in_use, 5);
        unsafe { pool.reset() };
        let stats = pool.stats();
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.free, stats.minted);
    }

    #[test]
    fn minted_blocks_share_chunks() {
        let mut pool = heap_pool(16);
        let ptrs: Vec<_> = (0..1000).map(|_| pool.acquire().unwrap().0).collect();
        assert_eq!(pool.stats().minted, 1000);
        assert_eq!(pool.stats().misses, 1000);
        // Batches of 1, 1, 2, 4, ..., 32 and then 64 blocks each.
        assert_eq!(pool.chunks.len(), 22);

        let mut addrs: Vec<usize> = ptrs.iter().map(|p| p.as_ptr() as usize).collect();
        addrs.sort_unstable();
        addrs.dedup();
        assert_eq!(addrs.len(), 1000);

        for ptr in ptrs {
            unsafe { pool.release(BlockHeader::from_payload(ptr)) };
        }
        assert_eq!(pool.free_len(), 1000);
        assert_eq!(pool.stats().in_use, 0);
    }

    #[test]
    fn reset_skips_uncarved_tail() {
        let mut pool = heap_pool(16);
        for _ in 0..5 {
            pool.acquire().unwrap();
        }
        // Chunks of 1, 1, 2 and 4 blocks; the last holds 3 unused slots.
        assert_eq!(pool.chunks.len(), 4);
        unsafe { pool.reset() };
        assert_eq!(pool.free_len(), 5);
        assert_eq!(pool.stats().minted, 5);
    }

    #[test]
    fn reset_counters_keeps_blocks() {
        let mut pool = heap_pool(16);
        let (ptr, _) = pool.acquire().unwrap();
        unsafe { pool.release(BlockHeader::from_payload(ptr)) };
        pool.reset_counters();
        let stats = pool.stats();
        assert_eq!(stats.allocations, 0);
        assert_eq!(stats.deallocations, 0);
        assert_eq!(stats.minted, 1);
        assert_eq!(stats.free, 1);
    }
}
