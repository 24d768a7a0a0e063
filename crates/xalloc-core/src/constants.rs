//! Layout constants and default configuration values.

use std::mem;

/// Alignment of every block header and therefore of every payload.
///
/// Large enough for any primitive on the supported targets (`u128`, `f64`, SIMD-free
/// structs), which is what "aligned for any object up to the block size" needs.
pub const BLOCK_ALIGN: usize = 16;

/// Smallest usable block size. A free block stores its free-list link in the payload.
pub const MIN_BLOCK_SIZE: usize = mem::size_of::<usize>();

/// Block sizes used when no menu is configured: powers of two from 8 to 4096 bytes.
pub const DEFAULT_BLOCK_SIZES: [usize; 10] = [8, 16, 32, 64, 128, 256, 512, 1024, 2048, 4096];

/// Default per-class block count for static pools.
pub const DEFAULT_STATIC_BLOCKS: usize = 1024;

/// Largest batch a heap-blocks pool reserves at once when its free list runs dry.
/// Batches start at one block and double with the pool's mint count up to this cap.
pub(crate) const MINT_BATCH_MAX: usize = 64;

/// Header magic for a block currently held by a caller.
pub(crate) const MAGIC_LIVE: u32 = 0xA110_C8ED;

/// Header magic for a block sitting on a free list.
pub(crate) const MAGIC_FREE: u32 = 0xF4EE_B10C;

/// Process exit codes used by the binaries.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// A pool or the system heap ran out of memory.
    pub const ERROR_OUT_OF_MEMORY: i32 = 3;
    /// Invalid configuration.
    pub const ERROR_CONFIG: i32 = 4;
}
