//! # xalloc-core
//!
//! Fixed-block memory allocator for long-running and latency-sensitive programs.
//!
//! Requests are rounded up to one of a fixed menu of block sizes and served from a
//! per-size pool. Freed blocks return to their pool's free list and are reused for
//! the same size class only, so the heap never fragments and, once the working set
//! is reached, allocation and release are O(1) free-list operations.
//!
//! Two modes share the same pools and free-list logic:
//!
//! - **heap blocks**: pools start empty and mint blocks from the system heap on demand;
//! - **static pools**: each class is reserved up front as one contiguous region, and
//!   running out is an out-of-memory error for that class alone.
//!
//! Requests above the largest class go to the system heap, tagged so that
//! [`Allocator::deallocate`] sends them back there.
#![warn(missing_docs)]
#![allow(unsafe_code)]

pub mod allocator;
pub mod block;
pub mod config;
pub mod constants;
pub mod error;
pub mod global;
pub mod handle;
pub mod observer;
mod oversize;
mod pool;
mod registry;
pub mod stats;

pub use allocator::Allocator;
pub use block::HEADER_SIZE;
pub use config::{AllocatorConfig, PoolMode};
pub use error::AllocError;
pub use handle::BlockHandle;
pub use observer::{AllocEvent, AllocObserver, LoggingObserver, NoOpObserver, RecordingObserver};
pub use stats::{AllocatorStats, PoolStats};
