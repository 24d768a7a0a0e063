//! Heap fallback for requests no pool can serve.
//!
//! Fallback blocks carry the same header as pooled blocks, tagged [`Owner::Oversize`],
//! so `deallocate` can route them back to the system heap without a size argument.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::block::{region_layout, BlockHeader, Owner};
use crate::error::AllocError;

fn layout_for(size: usize) -> Result<Layout, AllocError> {
    region_layout(size, 1).ok_or(AllocError::SizeOverflow { requested: size })
}

/// Allocate a heap block with `size` usable bytes and return its payload.
pub(crate) fn allocate(size: usize) -> Result<NonNull<u8>, AllocError> {
    let layout = layout_for(size)?;
    // SAFETY: the layout always includes the header, so its size is non-zero.
    let raw = unsafe { alloc::alloc(layout) };
    let header = NonNull::new(raw)
        .ok_or(AllocError::HeapExhausted {
            bytes: layout.size(),
        })?
        .cast::<BlockHeader>();
    // SAFETY: fresh allocation of `layout`, aligned to BLOCK_ALIGN.
    unsafe {
        BlockHeader::init(header, Owner::Oversize, size);
        BlockHeader::mark_live(header);
        Ok(BlockHeader::payload(header))
    }
}

/// Release a heap fallback block. Returns its usable size.
///
/// # Safety
///
/// `header` must belong to a live block produced by [`allocate`].
pub(crate) unsafe fn release(header: NonNull<BlockHeader>) -> usize {
    debug_assert_eq!(BlockHeader::owner(header), Owner::Oversize);
    let size = BlockHeader::extent(header);
    BlockHeader::mark_free(header);
    // Same computation that succeeded in `allocate`.
    if let Ok(layout) = layout_for(size) {
        alloc::dealloc(header.as_ptr().cast(), layout);
    }
    size
}
