//! Allocator statistics: per-pool snapshots and lock-free allocator-wide counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of one pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Usable bytes per block.
    pub block_size: usize,
    /// Fixed capacity (static pools only).
    pub capacity: Option<usize>,
    /// Blocks ever minted by this pool.
    pub minted: usize,
    /// Blocks currently on the free list.
    pub free: usize,
    /// Blocks currently held by callers.
    pub in_use: usize,
    /// Successful allocations served by this pool.
    pub allocations: u64,
    /// Blocks returned to this pool.
    pub deallocations: u64,
    /// Allocations served straight from the free list.
    pub hits: u64,
    /// Allocations that had to mint a new block.
    pub misses: u64,
}

/// Snapshot of the whole allocator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocatorStats {
    /// Operating mode name.
    pub mode: &'static str,
    /// Pools created so far, smallest block size first.
    pub pools: Vec<PoolStats>,
    /// Requests served by the heap fallback.
    pub oversize_allocations: u64,
    /// Heap fallback blocks released.
    pub oversize_deallocations: u64,
    /// Requests refused because a static pool was full.
    pub exhaustions: u64,
}

impl AllocatorStats {
    /// Stats for the pool serving `block_size`, if it exists.
    #[must_use]
    pub fn pool(&self, block_size: usize) -> Option<&PoolStats> {
        self.pools.iter().find(|p| p.block_size == block_size)
    }

    /// Total blocks held by callers, heap fallback included.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn live_blocks(&self) -> usize {
        let pooled: usize = self.pools.iter().map(|p| p.in_use).sum();
        let oversize = self
            .oversize_allocations
            .saturating_sub(self.oversize_deallocations);
        pooled + oversize as usize
    }

    /// Total blocks minted across all pools.
    #[must_use]
    pub fn total_minted(&self) -> usize {
        self.pools.iter().map(|p| p.minted).sum()
    }
}

/// Atomic allocator-wide counters, updated outside any pool lock.
pub(crate) struct AtomicAllocStats {
    oversize_allocations: AtomicU64,
    oversize_deallocations: AtomicU64,
    exhaustions: AtomicU64,
}

/// Values read from [`AtomicAllocStats`].
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AllocCounters {
    pub oversize_allocations: u64,
    pub oversize_deallocations: u64,
    pub exhaustions: u64,
}

impl AtomicAllocStats {
    pub(crate) fn new() -> Self {
        Self {
            oversize_allocations: AtomicU64::new(0),
            oversize_deallocations: AtomicU64::new(0),
            exhaustions: AtomicU64::new(0),
        }
    }

    pub(crate) fn snapshot(&self) -> AllocCounters {
        AllocCounters {
            oversize_allocations: self.oversize_allocations.load(Ordering::Relaxed),
            oversize_deallocations: self.oversize_deallocations.load(Ordering::Relaxed),
            exhaustions: self.exhaustions.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        self.oversize_allocations.store(0, Ordering::Relaxed);
        self.oversize_deallocations.store(0, Ordering::Relaxed);
        self.exhaustions.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_oversize_allocation(&self) {
        self.oversize_allocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_oversize_deallocation(&self) {
        self.oversize_deallocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exhaustion(&self) {
        self.exhaustions.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for AtomicAllocStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_counters_are_zeroed() {
        let stats = AtomicAllocStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.oversize_allocations, 0);
        assert_eq!(snap.oversize_deallocations, 0);
        assert_eq!(snap.exhaustions, 0);
    }

    #[test]
    fn record_and_snapshot() {
        let stats = AtomicAllocStats::new();
        stats.record_oversize_allocation();
        stats.record_oversize_allocation();
        stats.record_oversize_deallocation();
        stats.record_exhaustion();
        stats.record_exhaustion();
        stats.record_exhaustion();
        let snap = stats.snapshot();
        assert_eq!(snap.oversize_allocations, 2);
        assert_eq!(snap.oversize_deallocations, 1);
        assert_eq!(snap.exhaustions, 3);
    }

    #[test]
    fn reset_clears_counters() {
        let stats = AtomicAllocStats::new();
        stats.record_oversize_allocation();
        stats.record_exhaustion();
        stats.reset();
        let snap = stats.snapshot();
        assert_eq!(snap.oversize_allocations, 0);
        assert_eq!(snap.exhaustions, 0);
    }

    #[test]
    fn live_blocks_counts_pools_and_oversize() {
        let stats = AllocatorStats {
            mode: "heap-blocks",
            pools: vec![
                PoolStats {
                    block_size: 16,
                    in_use: 2,
                    minted: 3,
                    ..Default::default()
                },
                PoolStats {
                    block_size: 64,
                    in_use: 1,
                    minted: 1,
                    ..Default::default()
                },
            ],
            oversize_allocations: 5,
            oversize_deallocations: 4,
            exhaustions: 0,
        };
        assert_eq!(stats.live_blocks(), 4);
        assert_eq!(stats.total_minted(), 4);
        assert_eq!(stats.pool(64).map(|p| p.in_use), Some(1));
        assert!(stats.pool(32).is_none());
    }

    #[test]
    fn stats_serialize_to_json() {
        let stats = AllocatorStats {
            mode: "static-pools",
            pools: vec![PoolStats {
                block_size: 32,
                capacity: Some(4),
                ..Default::default()
            }],
            ..Default::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["mode"], "static-pools");
        assert_eq!(json["pools"][0]["block_size"], 32);
        assert_eq!(json["pools"][0]["capacity"], 4);
    }
}
