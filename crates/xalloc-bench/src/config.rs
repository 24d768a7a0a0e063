//! Application configuration from CLI flags and environment.

use std::path::PathBuf;

use clap::Parser;

use xalloc_core::AllocatorConfig;

use crate::errors::BenchError;

/// xalloc-bench: compare the system heap with fixed-block pools.
#[derive(Parser, Debug)]
#[command(name = "xalloc-bench", version, about)]
pub struct AppConfig {
    /// Allocations per workload run.
    #[arg(short = 'n', long, default_value_t = 10_000, env = "XALLOC_ITERATIONS")]
    pub iterations: usize,

    /// Runs per workload and heap.
    #[arg(short, long, default_value_t = 3, env = "XALLOC_RUNS")]
    pub runs: usize,

    /// Workload to run: list, map, string, or all.
    #[arg(short, long, default_value = "all")]
    pub workload: String,

    /// Comma-separated block sizes in bytes (e.g. "16,32,64").
    #[arg(long, env = "XALLOC_BLOCK_SIZES")]
    pub sizes: Option<String>,

    /// Pool mode: heap or static.
    #[arg(long, default_value = "heap", env = "XALLOC_MODE")]
    pub mode: String,

    /// Blocks reserved per class in static mode.
    #[arg(long, default_value_t = 16_384, env = "XALLOC_MAX_BLOCKS")]
    pub max_blocks: usize,

    /// Let exhausted static pools fall back to the system heap.
    #[arg(long)]
    pub spill: bool,

    /// JSON allocator configuration; overrides --sizes, --mode, and --max-blocks.
    #[arg(long, env = "XALLOC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (skip the statistics report).
    #[arg(short, long)]
    pub quiet: bool,
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Allocator configuration described by the flags or the config file.
    pub fn allocator_config(&self) -> anyhow::Result<AllocatorConfig> {
        if let Some(path) = &self.config {
            let json = std::fs::read_to_string(path).map_err(|source| BenchError::ConfigFile {
                path: path.clone(),
                source,
            })?;
            return Ok(AllocatorConfig::from_json(&json)?);
        }

        let sizes = match &self.sizes {
            Some(list) => parse_sizes(list)?,
            None => xalloc_core::constants::DEFAULT_BLOCK_SIZES.to_vec(),
        };
        let config = match self.mode.trim().to_ascii_lowercase().as_str() {
            "heap" | "heap-blocks" => AllocatorConfig::heap_blocks(&sizes),
            "static" | "static-pools" => {
                let config = AllocatorConfig::static_pools(&sizes, self.max_blocks);
                if self.spill {
                    config.with_spill_to_heap()
                } else {
                    config
                }
            }
            _ => return Err(BenchError::UnknownMode(self.mode.clone()).into()),
        };
        Ok(config)
    }
}

/// Parse a block size list like "16,32,64".
fn parse_sizes(list: &str) -> Result<Vec<usize>, BenchError> {
    list.split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| BenchError::InvalidSizes(list.to_string()))
}
