//! Process-wide allocator with explicit initialization.
//!
//! [`init`] must run once before any other call here; the configuration it takes is
//! fixed for the life of the process and the pools are never torn down.

use std::ptr::NonNull;
use std::sync::{Arc, OnceLock};

use crate::allocator::Allocator;
use crate::config::AllocatorConfig;
use crate::error::AllocError;
use crate::observer::{AllocObserver, NoOpObserver};
use crate::stats::AllocatorStats;

static GLOBAL: OnceLock<Allocator> = OnceLock::new();

/// Initialize the process-wide allocator.
pub fn init(config: AllocatorConfig) -> Result<&'static Allocator, AllocError> {
    init_with_observer(config, Arc::new(NoOpObserver::new()))
}

/// Initialize the process-wide allocator with an observer.
pub fn init_with_observer(
    config: AllocatorConfig,
    observer: Arc<dyn AllocObserver>,
) -> Result<&'static Allocator, AllocError> {
    if GLOBAL.get().is_some() {
        return Err(AllocError::AlreadyInitialized);
    }
    let allocator = Allocator::with_observer(config, observer)?;
    GLOBAL
        .set(allocator)
        .map_err(|_| AllocError::AlreadyInitialized)?;
    get()
}

/// The process-wide allocator.
pub fn get() -> Result<&'static Allocator, AllocError> {
    GLOBAL.get().ok_or(AllocError::NotInitialized)
}

/// Whether [`init`] has run.
#[must_use]
pub fn is_initialized() -> bool {
    GLOBAL.get().is_some()
}

/// Allocate from the process-wide allocator.
pub fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
    get()?.allocate(size)
}

/// Free a block obtained from [`allocate`] or [`reallocate`].
///
/// # Safety
///
/// Same contract as [`Allocator::deallocate`].
pub unsafe fn deallocate(ptr: NonNull<u8>) {
    if let Some(allocator) = GLOBAL.get() {
        allocator.deallocate(ptr);
    } else {
        debug_assert!(false, "deallocate before global::init");
    }
}

/// Resize a block, or allocate a fresh one when `ptr` is `None`.
///
/// # Safety
///
/// A `Some` pointer must satisfy the contract of [`Allocator::reallocate`].
pub unsafe fn reallocate(ptr: Option<NonNull<u8>>, size: usize) -> Result<NonNull<u8>, AllocError> {
    let allocator = get()?;
    match ptr {
        Some(ptr) => allocator.reallocate(ptr, size),
        None => allocator.allocate(size),
    }
}

/// Statistics of the process-wide allocator.
pub fn stats() -> Result<AllocatorStats, AllocError> {
    Ok(get()?.stats())
}
