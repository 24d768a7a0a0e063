//! Instrumentation hooks.
//!
//! The allocator reports which path each request took through an [`AllocObserver`].
//! Observers run after the pool lock is released and must not allocate from the
//! allocator that is calling them.

use parking_lot::Mutex;
use tracing::{debug, trace};

/// Path taken by an allocator operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocEvent {
    /// A pool was created for a size class.
    PoolCreated {
        /// Usable bytes per block.
        block_size: usize,
    },
    /// A pool minted a new block from the system heap (slow path).
    Minted {
        /// Usable bytes per block.
        block_size: usize,
        /// Blocks minted by the pool so far.
        total: usize,
    },
    /// A request was served from a pool's free list (fast path).
    Reused {
        /// Usable bytes per block.
        block_size: usize,
    },
    /// A block went back onto its pool's free list.
    Returned {
        /// Usable bytes per block.
        block_size: usize,
    },
    /// A static pool had no free block left.
    Exhausted {
        /// Usable bytes per block.
        block_size: usize,
        /// Fixed capacity of the pool.
        capacity: usize,
    },
    /// A request was served by the heap fallback.
    Oversize {
        /// Usable bytes of the heap block.
        size: usize,
    },
    /// A heap fallback block was released to the system heap.
    OversizeReleased {
        /// Usable bytes of the heap block.
        size: usize,
    },
}

/// Receiver of allocator events.
pub trait AllocObserver: Send + Sync {
    /// Receive one event.
    fn on_event(&self, event: &AllocEvent);
}

/// Null object pattern: discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

impl NoOpObserver {
    /// Create a new no-op observer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AllocObserver for NoOpObserver {
    fn on_event(&self, _event: &AllocEvent) {}
}

/// Observer that forwards per-block events to `tracing`.
///
/// Pool creation and exhaustion are already logged by the allocator itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl LoggingObserver {
    /// Create a new logging observer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AllocObserver for LoggingObserver {
    fn on_event(&self, event: &AllocEvent) {
        match *event {
            AllocEvent::PoolCreated { .. } | AllocEvent::Exhausted { .. } => {}
            AllocEvent::Minted { block_size, total } => {
                trace!(block_size, total, "Block minted");
            }
            AllocEvent::Reused { block_size } => trace!(block_size, "Block reused"),
            AllocEvent::Returned { block_size } => trace!(block_size, "Block returned"),
            AllocEvent::Oversize { size } => debug!(size, "Heap fallback allocation"),
            AllocEvent::OversizeReleased { size } => trace!(size, "Heap fallback release"),
        }
    }
}

/// Observer that keeps every event, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<AllocEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events seen so far.
    #[must_use]
    pub fn events(&self) -> Vec<AllocEvent> {
        self.events.lock().clone()
    }

    /// Remove and return the events seen so far.
    pub fn take(&self) -> Vec<AllocEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&AllocEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

impl AllocObserver for RecordingObserver {
    fn on_event(&self, event: &AllocEvent) {
        self.events.lock().push(*event);
    }
}
