//! Criterion benchmarks: system heap against the fixed-block allocator.

#![allow(unsafe_code)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use xalloc_core::{Allocator, AllocatorConfig};

const BATCH: usize = 256;

fn churn_system(size: usize) {
    let mut held: Vec<Box<[u8]>> = Vec::with_capacity(BATCH);
    for _ in 0..BATCH {
        held.push(vec![0u8; size].into_boxed_slice());
    }
    black_box(&held);
}

fn churn_pooled(alloc: &Allocator, size: usize) {
    let mut held = Vec::with_capacity(BATCH);
    for _ in 0..BATCH {
        held.push(alloc.allocate(size).unwrap());
    }
    black_box(&held);
    for ptr in held {
        unsafe { alloc.deallocate(ptr) };
    }
}

fn bench_allocation(c: &mut Criterion) {
    let sizes: Vec<usize> = vec![16, 64, 256, 1024];

    let mut group = c.benchmark_group("SystemHeap");
    for &size in &sizes {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| churn_system(size));
        });
    }
    group.finish();

    let heap_blocks = Allocator::new(AllocatorConfig::default()).unwrap();
    let mut group = c.benchmark_group("HeapBlocks");
    for &size in &sizes {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| churn_pooled(&heap_blocks, size));
        });
    }
    group.finish();

    let static_pools = Allocator::new(AllocatorConfig::static_pools(&sizes, BATCH)).unwrap();
    let mut group = c.benchmark_group("StaticPools");
    for &size in &sizes {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| churn_pooled(&static_pools, size));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_allocation);
criterion_main!(benches);
