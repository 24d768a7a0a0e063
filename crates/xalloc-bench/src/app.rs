//! Application entry point and dispatch.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use xalloc_core::{AllocObserver, Allocator, LoggingObserver, NoOpObserver};

use crate::config::AppConfig;
use crate::output::{compare, render_json, BenchReport, RunResult};
use crate::presenter::BenchPresenter;
use crate::workload::{FixedBlockHeap, Heap, SystemHeap, Workload};

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    let workloads = Workload::parse_selection(&config.workload)?;
    if config.runs == 0 {
        anyhow::bail!("--runs must be at least 1");
    }

    let observer: Arc<dyn AllocObserver> = if config.verbose {
        Arc::new(LoggingObserver::new())
    } else {
        Arc::new(NoOpObserver::new())
    };
    let allocator = Allocator::with_observer(config.allocator_config()?, observer)?;
    debug!(
        mode = allocator.mode().name(),
        iterations = config.iterations,
        runs = config.runs,
        "Starting benchmark"
    );

    let presenter = BenchPresenter::new(config.verbose, config.quiet);
    let system = SystemHeap;
    let fixed = FixedBlockHeap::new(&allocator);

    let mut results = Vec::new();
    for workload in workloads {
        bench(workload, &system, config, &presenter, &mut results)?;
        bench(workload, &fixed, config, &presenter, &mut results)?;
    }

    let comparisons = compare(&results, system.name(), fixed.name());
    let stats = allocator.stats();

    if config.json {
        let report = BenchReport {
            iterations: config.iterations,
            runs: results,
            comparisons,
            stats,
        };
        println!("{}", render_json(&report)?);
    } else {
        presenter.present_comparison(&comparisons);
        presenter.present_stats(&stats);
    }
    Ok(())
}

fn bench<H: Heap>(
    workload: Workload,
    heap: &H,
    config: &AppConfig,
    presenter: &BenchPresenter,
    results: &mut Vec<RunResult>,
) -> Result<()> {
    for run in 1..=config.runs {
        let (elapsed, checksum) = workload
            .measure(heap, config.iterations)
            .with_context(|| format!("{} workload on {}", workload.name(), heap.name()))?;
        let result = RunResult {
            workload,
            heap: heap.name(),
            run,
            elapsed,
            checksum,
        };
        if !config.json {
            presenter.present_run(&result);
        }
        results.push(result);
    }
    Ok(())
}
