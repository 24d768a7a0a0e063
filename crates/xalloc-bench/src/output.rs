//! Report types and text formatting.

use std::time::Duration;

use serde::{Serialize, Serializer};

use xalloc_core::AllocatorStats;

use crate::workload::Workload;

/// One timed workload run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub workload: Workload,
    pub heap: &'static str,
    pub run: usize,
    #[serde(rename = "elapsed_us", serialize_with = "as_micros")]
    pub elapsed: Duration,
    pub checksum: u64,
}

/// Best times of one workload on both heaps.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub workload: Workload,
    #[serde(rename = "system_us", serialize_with = "as_micros")]
    pub system: Duration,
    #[serde(rename = "fixed_block_us", serialize_with = "as_micros")]
    pub fixed_block: Duration,
    pub speedup: f64,
}

/// Everything one invocation produced.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub iterations: usize,
    pub runs: Vec<RunResult>,
    pub comparisons: Vec<Comparison>,
    pub stats: AllocatorStats,
}

#[allow(clippy::cast_precision_loss)]
fn as_micros<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(d.as_nanos() as f64 / 1000.0)
}

/// Pair the best system-heap and fixed-block times per workload.
#[must_use]
pub fn compare(results: &[RunResult], system: &str, fixed_block: &str) -> Vec<Comparison> {
    let best = |workload: Workload, heap: &str| {
        results
            .iter()
            .filter(|r| r.workload == workload && r.heap == heap)
            .map(|r| r.elapsed)
            .min()
    };
    let mut comparisons = Vec::new();
    for workload in Workload::ALL {
        if let (Some(system), Some(fixed_block)) =
            (best(workload, system), best(workload, fixed_block))
        {
            let speedup = if fixed_block.is_zero() {
                0.0
            } else {
                system.as_secs_f64() / fixed_block.as_secs_f64()
            };
            comparisons.push(Comparison {
                workload,
                system,
                fixed_block,
                speedup,
            });
        }
    }
    comparisons
}

/// Format a duration for display.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 0.001 {
        format!("{:.2}µs", secs * 1_000_000.0)
    } else if secs < 1.0 {
        format!("{:.2}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.3}s")
    } else {
        let mins = (secs / 60.0).floor() as u64;
        let remaining = secs - (mins as f64 * 60.0);
        format!("{mins}m{remaining:.1}s")
    }
}

/// Format a number with thousand separators.
#[must_use]
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Render the allocator statistics report.
#[must_use]
pub fn format_stats(stats: &AllocatorStats) -> String {
    let mut out = format!("Allocator statistics ({})\n", stats.mode);
    out.push_str(&format!(
        "  {:>10} {:>9} {:>9} {:>9} {:>9} {:>12} {:>12} {:>12} {:>9}\n",
        "block", "capacity", "minted", "free", "in use", "allocs", "deallocs", "hits", "misses"
    ));
    for pool in &stats.pools {
        let capacity = pool
            .capacity
            .map_or_else(|| "-".to_string(), |c| format_number(c as u64));
        out.push_str(&format!(
            "  {:>10} {:>9} {:>9} {:>9} {:>9} {:>12} {:>12} {:>12} {:>9}\n",
            pool.block_size,
            capacity,
            format_number(pool.minted as u64),
            format_number(pool.free as u64),
            format_number(pool.in_use as u64),
            format_number(pool.allocations),
            format_number(pool.deallocations),
            format_number(pool.hits),
            format_number(pool.misses),
        ));
    }
    out.push_str(&format!(
        "  oversize: {} allocated, {} released; exhaustions: {}\n",
        format_number(stats.oversize_allocations),
        format_number(stats.oversize_deallocations),
        format_number(stats.exhaustions),
    ));
    out
}

/// Render the report as pretty-printed JSON.
pub fn render_json(report: &BenchReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}
