//! Process-wide allocator lifecycle.
//!
//! The global allocator can be initialized once per process, so the whole
//! lifecycle runs in a single test.

#![allow(unsafe_code)]

use xalloc_core::{global, AllocError, AllocatorConfig, PoolMode};

#[test]
fn global_lifecycle() {
    assert!(!global::is_initialized());
    assert_eq!(global::allocate(16), Err(AllocError::NotInitialized));
    assert_eq!(global::stats().unwrap_err(), AllocError::NotInitialized);

    // An invalid configuration leaves the global slot empty
    assert!(matches!(
        global::init(AllocatorConfig::heap_blocks(&[])),
        Err(AllocError::Config(_))
    ));
    assert!(!global::is_initialized());

    let allocator = global::init(AllocatorConfig::static_pools(&[16, 64], 4)).unwrap();
    assert!(global::is_initialized());
    assert_eq!(
        allocator.mode(),
        PoolMode::StaticPools {
            max_blocks: 4,
            spill_to_heap: false
        }
    );

    let ptr = global::allocate(10).unwrap();
    let grown = unsafe { global::reallocate(Some(ptr), 50).unwrap() };
    let fresh = unsafe { global::reallocate(None, 8).unwrap() };
    unsafe {
        assert_eq!(allocator.usable_size(grown), 64);
        global::deallocate(grown);
        global::deallocate(fresh);
    }

    let stats = global::stats().unwrap();
    assert_eq!(stats.mode, "static-pools");
    assert_eq!(stats.live_blocks(), 0);
    assert_eq!(stats.pool(16).map(|p| p.allocations), Some(2));

    assert_eq!(
        global::init(AllocatorConfig::default()).unwrap_err(),
        AllocError::AlreadyInitialized
    );
}
