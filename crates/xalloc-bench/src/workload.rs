//! Benchmark workloads and the heaps they run against.
//!
//! Each workload models the allocation pattern of a standard container: list nodes,
//! tree-map nodes with lookups, and list nodes owning a string grown in place.

use std::hint::black_box;
use std::ops::DerefMut;
use std::time::{Duration, Instant};

use serde::Serialize;

use xalloc_core::{AllocError, Allocator, BlockHandle};

use crate::errors::BenchError;

/// Node of a doubly linked list holding an `i32`.
pub const LIST_NODE_SIZE: usize = 24;

/// Node of a red-black tree map from `i32` to a byte.
pub const MAP_NODE_SIZE: usize = 40;

/// List node owning a string header.
pub const STRING_NODE_SIZE: usize = 48;

const STRING_SEED: &[u8] = b"benchmark";

const STRING_TAIL: &[u8] = b"benchmark test benchmark test benchmark test benchmark test \
benchmark test benchmark test benchmark test benchmark test benchmark test benchmark test \
benchmark test benchmark test benchmark test benchmark test";

/// Final length of every string built by [`Workload::String`].
pub const STRING_LEN: usize = STRING_SEED.len() + STRING_TAIL.len();

/// Something that hands out byte blocks.
pub trait Heap {
    /// Owned block; freed when dropped.
    type Block: DerefMut<Target = [u8]>;

    /// Name used in reports.
    fn name(&self) -> &'static str;

    /// Allocate a zeroed block of `len` bytes.
    fn alloc(&self, len: usize) -> Result<Self::Block, AllocError>;

    /// Grow `block` to `len` bytes, keeping its contents.
    fn grow(&self, block: &mut Self::Block, len: usize) -> Result<(), AllocError>;
}

/// The global Rust allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHeap;

impl Heap for SystemHeap {
    type Block = Vec<u8>;

    fn name(&self) -> &'static str {
        "system heap"
    }

    fn alloc(&self, len: usize) -> Result<Vec<u8>, AllocError> {
        Ok(vec![0; len])
    }

    fn grow(&self, block: &mut Vec<u8>, len: usize) -> Result<(), AllocError> {
        block.resize(len, 0);
        Ok(())
    }
}

/// Blocks served by a fixed-block [`Allocator`].
#[derive(Debug, Clone, Copy)]
pub struct FixedBlockHeap<'a> {
    allocator: &'a Allocator,
}

impl<'a> FixedBlockHeap<'a> {
    #[must_use]
    pub fn new(allocator: &'a Allocator) -> Self {
        Self { allocator }
    }
}

impl<'a> Heap for FixedBlockHeap<'a> {
    type Block = BlockHandle<'a>;

    fn name(&self) -> &'static str {
        "fixed block"
    }

    fn alloc(&self, len: usize) -> Result<BlockHandle<'a>, AllocError> {
        self.allocator.alloc_block(len)
    }

    fn grow(&self, block: &mut BlockHandle<'a>, len: usize) -> Result<(), AllocError> {
        block.resize(len)
    }
}

/// Allocation pattern to benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Workload {
    /// Append `n` small nodes to a list, then clear it.
    List,
    /// Insert `n` keys into a tree map, probing an earlier key after each insert.
    Map,
    /// Append `n` grown strings to a list, then clear it.
    String,
}

impl Workload {
    /// All workloads in run order.
    pub const ALL: [Workload; 3] = [Workload::List, Workload::Map, Workload::String];

    /// Parse a `--workload` value.
    pub fn parse_selection(name: &str) -> Result<Vec<Workload>, BenchError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::ALL.to_vec()),
            "list" => Ok(vec![Workload::List]),
            "map" => Ok(vec![Workload::Map]),
            "string" => Ok(vec![Workload::String]),
            _ => Err(BenchError::UnknownWorkload(name.to_string())),
        }
    }

    /// Report name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Workload::List => "list",
            Workload::Map => "map",
            Workload::String => "string",
        }
    }

    /// Run once against `heap`, returning a checksum of the data written.
    pub fn run<H: Heap>(self, heap: &H, iterations: usize) -> Result<u64, AllocError> {
        match self {
            Workload::List => run_list(heap, iterations),
            Workload::Map => run_map(heap, iterations),
            Workload::String => run_string(heap, iterations),
        }
    }

    /// Time one run.
    pub fn measure<H: Heap>(
        self,
        heap: &H,
        iterations: usize,
    ) -> Result<(Duration, u64), AllocError> {
        let start = Instant::now();
        let checksum = black_box(self.run(heap, iterations)?);
        Ok((start.elapsed(), checksum))
    }
}

fn run_list<H: Heap>(heap: &H, iterations: usize) -> Result<u64, AllocError> {
    let mut list = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let mut node = heap.alloc(LIST_NODE_SIZE)?;
        node[..4].copy_from_slice(&123i32.to_le_bytes());
        list.push(node);
    }
    let checksum = list.iter().map(|node| u64::from(node[0])).sum();
    list.clear();
    Ok(checksum)
}

fn key_of(node: &[u8]) -> u32 {
    u32::from_le_bytes([node[0], node[1], node[2], node[3]])
}

fn run_map<H: Heap>(heap: &H, iterations: usize) -> Result<u64, AllocError> {
    let mut nodes: Vec<H::Block> = Vec::with_capacity(iterations);
    let mut checksum = 0u64;
    for i in 0..iterations {
        let key = u32::try_from(i).unwrap_or(u32::MAX);
        let mut node = heap.alloc(MAP_NODE_SIZE)?;
        node[..4].copy_from_slice(&key.to_le_bytes());
        node[4] = b'a';
        nodes.push(node);

        let probe = key / 2;
        let found = nodes.partition_point(|node| key_of(node) < probe);
        if let Some(node) = nodes.get(found) {
            checksum += u64::from(key_of(node)) + u64::from(node[4]);
        }
    }
    nodes.clear();
    Ok(checksum)
}

fn run_string<H: Heap>(heap: &H, iterations: usize) -> Result<u64, AllocError> {
    let mut list = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let mut text = heap.alloc(STRING_SEED.len())?;
        text.copy_from_slice(STRING_SEED);
        heap.grow(&mut text, STRING_LEN)?;
        text[STRING_SEED.len()..].copy_from_slice(STRING_TAIL);

        let node = heap.alloc(STRING_NODE_SIZE)?;
        list.push((node, text));
    }
    let checksum = list.iter().map(|(_, text)| text.len() as u64).sum();
    list.clear();
    Ok(checksum)
}
