#![no_main]

use libfuzzer_sys::fuzz_target;
use std::ptr::NonNull;

use xalloc_core::{Allocator, AllocatorConfig};

struct Live {
    ptr: NonNull<u8>,
    len: usize,
    tag: u8,
}

fn check(live: &Live) {
    let bytes = unsafe { std::slice::from_raw_parts(live.ptr.as_ptr(), live.len) };
    assert!(bytes.iter().all(|&b| b == live.tag), "block contents clobbered");
}

fuzz_target!(|data: &[u8]| {
    let Some((&mode, ops)) = data.split_first() else {
        return;
    };
    // Low bits pick the mode; static pools are kept small so exhaustion is reachable
    let config = match mode % 3 {
        0 => AllocatorConfig::heap_blocks(&[16, 32, 64, 128, 256]),
        1 => AllocatorConfig::static_pools(&[16, 64, 256], 8),
        _ => AllocatorConfig::static_pools(&[16, 64, 256], 8).with_spill_to_heap(),
    };
    let alloc = Allocator::new(config).unwrap();
    let mut live: Vec<Live> = Vec::new();

    for (i, chunk) in ops.chunks_exact(3).enumerate() {
        let size = usize::from(u16::from_le_bytes([chunk[1], chunk[2]])) % 600;
        let tag = i as u8;
        match chunk[0] % 4 {
            0 | 1 => match alloc.allocate(size) {
                Ok(ptr) => {
                    assert!(unsafe { alloc.usable_size(ptr) } >= size);
                    unsafe { std::ptr::write_bytes(ptr.as_ptr(), tag, size) };
                    live.push(Live { ptr, len: size, tag });
                }
                Err(err) => assert!(err.is_out_of_memory()),
            },
            2 if !live.is_empty() => {
                let block = live.swap_remove(size % live.len());
                check(&block);
                unsafe { alloc.deallocate(block.ptr) };
            }
            3 if !live.is_empty() => {
                let index = usize::from(chunk[1]) % live.len();
                check(&live[index]);
                if let Ok(ptr) = unsafe { alloc.reallocate(live[index].ptr, size) } {
                    let keep = live[index].len.min(size);
                    let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), keep) };
                    assert!(bytes.iter().all(|&b| b == live[index].tag));
                    unsafe { std::ptr::write_bytes(ptr.as_ptr(), live[index].tag, size) };
                    live[index].ptr = ptr;
                    live[index].len = size;
                }
            }
            _ => {}
        }
    }

    for block in live.drain(..) {
        check(&block);
        unsafe { alloc.deallocate(block.ptr) };
    }
    let stats = alloc.stats();
    assert_eq!(stats.live_blocks(), 0);
    for pool in &stats.pools {
        assert_eq!(pool.free, pool.minted);
    }
});
