//! Block layout and the hidden header.
//!
//! Every block handed out by the allocator is preceded by a [`BlockHeader`]:
//!
//! ```text
//! +----------------+  <- header (BLOCK_ALIGN aligned)
//! |  magic  owner  |
//! |     extent     |
//! +----------------+  <- payload returned to the caller (BLOCK_ALIGN aligned)
//! |                |
//! |    payload     |  <- `extent` usable bytes; holds the free-list link while free
//! |                |
//! +----------------+
//! ```
//!
//! The header records the owning pool as an index into the registry rather than a
//! pointer, so a damaged header can at worst name the wrong size class. All pointer
//! arithmetic between header and payload lives in this module.

use std::alloc::Layout;
use std::mem;
use std::ptr::NonNull;

use crate::constants::{BLOCK_ALIGN, MAGIC_FREE, MAGIC_LIVE};

/// Index of a pool in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct PoolId(u32);

impl PoolId {
    pub(crate) fn new(index: usize) -> Self {
        // Menus longer than u32::MAX - 1 classes are rejected by config validation.
        Self(u32::try_from(index).unwrap_or(OVERSIZE_TAG - 1))
    }

    /// Position of the pool in the registry.
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Who a block goes back to on free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    Pool(PoolId),
    Oversize,
}

const OVERSIZE_TAG: u32 = u32::MAX;

/// Header stored in front of every payload.
#[repr(C, align(16))]
pub(crate) struct BlockHeader {
    magic: u32,
    owner: u32,
    extent: usize,
}

const _: () = assert!(mem::align_of::<BlockHeader>() == BLOCK_ALIGN);

/// Bytes of overhead in front of every payload.
pub const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

/// Distance between consecutive blocks of a class with `size` usable bytes.
pub(crate) fn stride_for(size: usize) -> Option<usize> {
    let total = HEADER_SIZE.checked_add(size)?;
    let rounded = total.checked_add(BLOCK_ALIGN - 1)?;
    Some(rounded & !(BLOCK_ALIGN - 1))
}

/// Layout of a region holding `count` blocks of `size` usable bytes.
pub(crate) fn region_layout(size: usize, count: usize) -> Option<Layout> {
    let bytes = stride_for(size)?.checked_mul(count)?;
    Layout::from_size_align(bytes, BLOCK_ALIGN).ok()
}

impl BlockHeader {
    /// Write a fresh header marked free.
    ///
    /// # Safety
    ///
    /// `header` must point to writable memory of at least `HEADER_SIZE + extent` bytes,
    /// aligned to `BLOCK_ALIGN`.
    pub(crate) unsafe fn init(header: NonNull<Self>, owner: Owner, extent: usize) {
        let owner = match owner {
            Owner::Pool(id) => id.0,
            Owner::Oversize => OVERSIZE_TAG,
        };
        header.as_ptr().write(Self {
            magic: MAGIC_FREE,
            owner,
            extent,
        });
    }

    /// Payload address of the block behind `header`.
    ///
    /// # Safety
    ///
    /// `header` must point to a header written by [`BlockHeader::init`].
    #[inline]
    pub(crate) unsafe fn payload(header: NonNull<Self>) -> NonNull<u8> {
        NonNull::new_unchecked(header.as_ptr().add(1)).cast()
    }

    /// Header of the block whose payload starts at `payload`.
    ///
    /// # Safety
    ///
    /// `payload` must be an address previously produced by [`BlockHeader::payload`].
    #[inline]
    pub(crate) unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<Self> {
        NonNull::new_unchecked(payload.as_ptr().cast::<Self>().sub(1))
    }

    /// # Safety
    ///
    /// `header` must point to an initialized header.
    #[inline]
    pub(crate) unsafe fn owner(header: NonNull<Self>) -> Owner {
        match (*header.as_ptr()).owner {
            OVERSIZE_TAG => Owner::Oversize,
            index => Owner::Pool(PoolId(index)),
        }
    }

    /// Usable bytes behind the header.
    ///
    /// # Safety
    ///
    /// `header` must point to an initialized header.
    #[inline]
    pub(crate) unsafe fn extent(header: NonNull<Self>) -> usize {
        (*header.as_ptr()).extent
    }

    /// # Safety
    ///
    /// `header` must point to an initialized header.
    #[inline]
    pub(crate) unsafe fn is_live(header: NonNull<Self>) -> bool {
        (*header.as_ptr()).magic == MAGIC_LIVE
    }

    /// # Safety
    ///
    /// `header` must point to an initialized header.
    #[inline]
    pub(crate) unsafe fn mark_live(header: NonNull<Self>) {
        (*header.as_ptr()).magic = MAGIC_LIVE;
    }

    /// # Safety
    ///
    /// `header` must point to an initialized header.
    #[inline]
    pub(crate) unsafe fn mark_free(header: NonNull<Self>) {
        (*header.as_ptr()).magic = MAGIC_FREE;
    }
}

/// Intrusive LIFO list of free blocks. The link to the next block is kept in the
/// first word of each free payload, so a free block costs nothing extra.
pub(crate) struct FreeList {
    head: Option<NonNull<BlockHeader>>,
    len: usize,
}

impl FreeList {
    pub(crate) const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// # Safety
    ///
    /// `block` must be an initialized block with at least one word of payload that is
    /// not on any free list and not held by a caller.
    pub(crate) unsafe fn push(&mut self, block: NonNull<BlockHeader>) {
        BlockHeader::mark_free(block);
        let link = BlockHeader::payload(block)
            .as_ptr()
            .cast::<Option<NonNull<BlockHeader>>>();
        link.write(self.head);
        self.head = Some(block);
        self.len += 1;
    }

    pub(crate) fn pop(&mut self) -> Option<NonNull<BlockHeader>> {
        let block = self.head?;
        // SAFETY: every node was linked by `push`, which wrote a valid link into the
        // payload of a block that stays owned by the pool while it is on the list.
        unsafe {
            let link = BlockHeader::payload(block)
                .as_ptr()
                .cast::<Option<NonNull<BlockHeader>>>();
            self.head = link.read();
        }
        self.len -= 1;
        Some(block)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Forget every node without touching memory.
    pub(crate) fn clear(&mut self) {
        self.head = None;
        self.len = 0;
    }
}
