//! Allocator configuration: the block-size menu and the operating mode.
//!
//! Configuration is fixed when an [`crate::Allocator`] is built. Block sizes are
//! usable payload bytes; the hidden header is added on top when blocks are laid out.

use serde::{Deserialize, Serialize};

use crate::block::stride_for;
use crate::constants::{DEFAULT_BLOCK_SIZES, DEFAULT_STATIC_BLOCKS, MIN_BLOCK_SIZE};
use crate::error::AllocError;

/// How pools obtain their blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolMode {
    /// Pools start empty and mint blocks from the system heap on demand.
    /// Freed blocks are kept for reuse and never handed back to the heap.
    #[default]
    HeapBlocks,
    /// Every pool is reserved up front as one contiguous region of `max_blocks` blocks.
    StaticPools {
        /// Number of blocks reserved per size class.
        max_blocks: usize,
        /// Route requests for an exhausted class to the heap fallback instead of failing.
        #[serde(default)]
        spill_to_heap: bool,
    },
}

impl PoolMode {
    /// Fixed per-class capacity, if any.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        match self {
            Self::HeapBlocks => None,
            Self::StaticPools { max_blocks, .. } => Some(*max_blocks),
        }
    }

    /// Short name used in logs and reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::HeapBlocks => "heap-blocks",
            Self::StaticPools { .. } => "static-pools",
        }
    }
}

/// Allocator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Usable sizes of the block classes, in bytes.
    #[serde(default = "default_block_sizes")]
    pub block_sizes: Vec<usize>,
    /// Operating mode.
    #[serde(default)]
    pub mode: PoolMode,
}

fn default_block_sizes() -> Vec<usize> {
    DEFAULT_BLOCK_SIZES.to_vec()
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            block_sizes: default_block_sizes(),
            mode: PoolMode::HeapBlocks,
        }
    }
}

impl AllocatorConfig {
    /// Heap-blocks configuration over the given menu.
    #[must_use]
    pub fn heap_blocks(block_sizes: &[usize]) -> Self {
        Self {
            block_sizes: block_sizes.to_vec(),
            mode: PoolMode::HeapBlocks,
        }
    }

    /// Static-pools configuration reserving `max_blocks` blocks per class.
    #[must_use]
    pub fn static_pools(block_sizes: &[usize], max_blocks: usize) -> Self {
        Self {
            block_sizes: block_sizes.to_vec(),
            mode: PoolMode::StaticPools {
                max_blocks,
                spill_to_heap: false,
            },
        }
    }

    /// Static-pools configuration over the default menu and block count.
    #[must_use]
    pub fn default_static() -> Self {
        Self::static_pools(&DEFAULT_BLOCK_SIZES, DEFAULT_STATIC_BLOCKS)
    }

    /// Let exhausted static pools spill into the heap fallback. No effect in heap-blocks mode.
    #[must_use]
    pub fn with_spill_to_heap(mut self) -> Self {
        if let PoolMode::StaticPools { spill_to_heap, .. } = &mut self.mode {
            *spill_to_heap = true;
        }
        self
    }

    /// Sort the menu and drop duplicate sizes.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        self.block_sizes.sort_unstable();
        self.block_sizes.dedup();
        self
    }

    /// Check that the configuration can be turned into pools.
    pub fn validate(&self) -> Result<(), AllocError> {
        if self.block_sizes.is_empty() {
            return Err(AllocError::Config("block size menu is empty".into()));
        }
        if u32::try_from(self.block_sizes.len()).map_or(true, |n| n == u32::MAX) {
            return Err(AllocError::Config("too many block sizes".into()));
        }
        if self.block_sizes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(AllocError::Config(
                "block sizes must be strictly increasing".into(),
            ));
        }
        for &size in &self.block_sizes {
            if size < MIN_BLOCK_SIZE {
                return Err(AllocError::Config(format!(
                    "block size {size} is below the {MIN_BLOCK_SIZE}-byte minimum"
                )));
            }
            let stride = stride_for(size).ok_or_else(|| {
                AllocError::Config(format!("block size {size} overflows the block layout"))
            })?;
            if let Some(max_blocks) = self.mode.capacity() {
                if max_blocks == 0 {
                    return Err(AllocError::Config("static pools need max_blocks > 0".into()));
                }
                let region = stride.checked_mul(max_blocks);
                if !matches!(region, Some(bytes) if bytes <= isize::MAX.unsigned_abs()) {
                    return Err(AllocError::Config(format!(
                        "static region for {size}-byte blocks overflows ({max_blocks} blocks)"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Largest configured block size.
    #[must_use]
    pub fn max_block_size(&self) -> usize {
        self.block_sizes.iter().copied().max().unwrap_or(0)
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, AllocError> {
        serde_json::from_str(json).map_err(|e| AllocError::Config(e.to_string()))
    }

    /// Render the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String, AllocError> {
        serde_json::to_string_pretty(self).map_err(|e| AllocError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_heap_blocks_powers_of_two() {
        let config = AllocatorConfig::default();
        assert_eq!(config.mode, PoolMode::HeapBlocks);
        assert_eq!(config.block_sizes, DEFAULT_BLOCK_SIZES.to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn normalize_sorts_and_dedups() {
        let config = AllocatorConfig::heap_blocks(&[64, 16, 32, 16]).normalize();
        assert_eq!(config.block_sizes, vec![16, 32, 64]);
    }

    #[test]
    fn validate_rejects_empty_menu() {
        let config = AllocatorConfig::heap_blocks(&[]);
        assert!(matches!(config.validate(), Err(AllocError::Config(_))));
    }

    #[test]
    fn validate_rejects_unsorted_menu() {
        let config = AllocatorConfig::heap_blocks(&[32, 16]);
        assert!(config.validate().is_err());
        assert!(config.normalize().validate().is_ok());
    }

    #[test]
    fn validate_rejects_tiny_blocks() {
        let config = AllocatorConfig::heap_blocks(&[1, 16]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let config = AllocatorConfig::static_pools(&[16], 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_overflowing_region() {
        let config = AllocatorConfig::static_pools(&[1 << 20], usize::MAX / 2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn spill_only_applies_to_static_mode() {
        let heap = AllocatorConfig::heap_blocks(&[16]).with_spill_to_heap();
        assert_eq!(heap.mode, PoolMode::HeapBlocks);

        let fixed = AllocatorConfig::static_pools(&[16], 4).with_spill_to_heap();
        assert_eq!(
            fixed.mode,
            PoolMode::StaticPools {
                max_blocks: 4,
                spill_to_heap: true
            }
        );
    }

    #[test]
    fn json_static_config() {
        let json = r#"{
            "block_sizes": [16, 32, 64],
            "mode": { "kind": "static_pools", "max_blocks": 8 }
        }"#;
        let config = AllocatorConfig::from_json(json).unwrap();
        assert_eq!(config.block_sizes, vec![16, 32, 64]);
        assert_eq!(config.mode.capacity(), Some(8));
        assert_eq!(config.mode.name(), "static-pools");
    }

    #[test]
    fn json_defaults_fill_missing_fields() {
        let config = AllocatorConfig::from_json("{}").unwrap();
        assert_eq!(config, AllocatorConfig::default());
    }

    #[test]
    fn json_round_trip_keeps_mode() {
        let config = AllocatorConfig::static_pools(&[16, 32], 3).with_spill_to_heap();
        let json = config.to_json().unwrap();
        assert_eq!(AllocatorConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn json_rejects_unknown_mode() {
        let json = r#"{ "mode": { "kind": "buddy" } }"#;
        assert!(matches!(
            AllocatorConfig::from_json(json),
            Err(AllocError::Config(_))
        ));
    }
}
