//! Allocation error type.

/// Error type for allocator operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// A static pool ran out of blocks.
    #[error("out of memory: {block_size}-byte pool exhausted ({capacity} blocks)")]
    PoolExhausted {
        /// Usable size of the exhausted class.
        block_size: usize,
        /// Fixed capacity of the pool.
        capacity: usize,
    },

    /// The system heap refused to supply memory.
    #[error("out of memory: system heap refused {bytes} bytes")]
    HeapExhausted {
        /// Bytes requested from the heap, header included.
        bytes: usize,
    },

    /// The request cannot be expressed as a valid memory layout.
    #[error("out of memory: {requested} bytes overflows the block layout")]
    SizeOverflow {
        /// Bytes requested by the caller.
        requested: usize,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The process-wide allocator was used before `global::init`.
    #[error("global allocator is not initialized")]
    NotInitialized,

    /// `global::init` was called twice.
    #[error("global allocator is already initialized")]
    AlreadyInitialized,
}

impl AllocError {
    /// Whether this error belongs to the out-of-memory family.
    #[must_use]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::HeapExhausted { .. } | Self::SizeOverflow { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_memory_family() {
        assert!(AllocError::PoolExhausted {
            block_size: 16,
            capacity: 4
        }
        .is_out_of_memory());
        assert!(AllocError::HeapExhausted { bytes: 64 }.is_out_of_memory());
        assert!(AllocError::SizeOverflow { requested: usize::MAX }.is_out_of_memory());
        assert!(!AllocError::Config("bad".into()).is_out_of_memory());
        assert!(!AllocError::NotInitialized.is_out_of_memory());
    }

    #[test]
    fn display_names_the_class() {
        let err = AllocError::PoolExhausted {
            block_size: 32,
            capacity: 8,
        };
        assert_eq!(
            err.to_string(),
            "out of memory: 32-byte pool exhausted (8 blocks)"
        );
    }
}
