//! CLI result presenter.

use xalloc_core::AllocatorStats;

use crate::output::{format_duration, format_number, format_stats, Comparison, RunResult};

/// Prints benchmark progress and the final tables.
pub struct BenchPresenter {
    verbose: bool,
    quiet: bool,
}

impl BenchPresenter {
    #[must_use]
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// One line per run, like "list fixed block (Run 2) elapsed time: 1.20ms".
    pub fn present_run(&self, result: &RunResult) {
        let mut line = format!(
            "{} {} (Run {}) elapsed time: {}",
            result.workload.name(),
            result.heap,
            result.run,
            format_duration(result.elapsed),
        );
        if self.verbose {
            line.push_str(&format!(" [checksum {}]", format_number(result.checksum)));
        }
        println!("{line}");
    }

    pub fn present_comparison(&self, comparisons: &[Comparison]) {
        if comparisons.is_empty() {
            return;
        }
        println!("\nBest of runs:");
        println!("{:-<60}", "");
        for c in comparisons {
            println!(
                "  {:<10} {:>12} {:>12} {:>8.2}x",
                c.workload.name(),
                format_duration(c.system),
                format_duration(c.fixed_block),
                c.speedup,
            );
        }
    }

    pub fn present_stats(&self, stats: &AllocatorStats) {
        if self.quiet {
            return;
        }
        println!();
        print!("{}", format_stats(stats));
    }
}
