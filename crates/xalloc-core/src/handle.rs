//! Safe owning handle over one allocator block.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use crate::allocator::Allocator;
use crate::error::AllocError;

/// A zero-initialized block that returns itself to its allocator on drop.
///
/// Derefs to the `len` requested bytes; the underlying block may be larger
/// (see [`BlockHandle::capacity`]).
pub struct BlockHandle<'a> {
    allocator: &'a Allocator,
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the handle owns its block exclusively and `Allocator` is `Sync`,
// so freeing from another thread is sound.
unsafe impl Send for BlockHandle<'_> {}

// SAFETY: shared access only exposes `&[u8]`.
unsafe impl Sync for BlockHandle<'_> {}

impl<'a> BlockHandle<'a> {
    /// # Safety
    ///
    /// `ptr` must be a live block of `allocator` whose first `len` bytes are initialized.
    pub(crate) unsafe fn from_raw(allocator: &'a Allocator, ptr: NonNull<u8>, len: usize) -> Self {
        Self {
            allocator,
            ptr,
            len,
        }
    }

    /// Number of bytes exposed by the handle.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the handle exposes zero bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Usable bytes of the underlying block.
    #[must_use]
    pub fn capacity(&self) -> usize {
        // SAFETY: the handle keeps its block live.
        unsafe { self.allocator.usable_size(self.ptr) }
    }

    /// Raw payload pointer.
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// Grow or shrink the visible length, moving to a larger block when needed.
    /// New bytes are zeroed. On error the handle is unchanged.
    pub fn resize(&mut self, new_len: usize) -> Result<(), AllocError> {
        if new_len > self.len {
            // SAFETY: the handle owns a live block of `self.allocator`.
            self.ptr = unsafe { self.allocator.reallocate(self.ptr, new_len)? };
            // SAFETY: the block now holds at least `new_len` bytes.
            unsafe { ptr::write_bytes(self.ptr.as_ptr().add(self.len), 0, new_len - self.len) };
        }
        self.len = new_len;
        Ok(())
    }

    /// Give up ownership without freeing. The caller must later pass the pointer to
    /// [`Allocator::deallocate`] on the same allocator.
    #[must_use]
    pub fn into_raw(self) -> NonNull<u8> {
        let ptr = self.ptr;
        std::mem::forget(self);
        ptr
    }
}

impl Deref for BlockHandle<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: the first `len` bytes are initialized and owned by the handle.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl DerefMut for BlockHandle<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: as for `deref`, and the handle is borrowed mutably.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for BlockHandle<'_> {
    fn drop(&mut self) {
        // SAFETY: the handle owns a live block of `self.allocator`.
        unsafe { self.allocator.deallocate(self.ptr) };
    }
}

impl fmt::Debug for BlockHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockHandle")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}
