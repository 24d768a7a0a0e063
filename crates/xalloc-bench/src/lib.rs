//! xalloc-bench library: benchmark driver for the fixed-block allocator.

pub mod app;
pub mod config;
pub mod errors;
pub mod output;
pub mod presenter;
pub mod workload;
