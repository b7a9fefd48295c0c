#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use mcas::{mcas, new_cell, Cell};
use rayon::prelude::*;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// How much single-thread throughput degrades as the number of cells in one
/// `mcas` batch (N) grows: each acquire is an independent CCAS, so cost
/// should scale roughly linearly with N in the uncontended case.
fn width_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("width");
    for &n in &[1usize, 2, 4, 8, 16, 32] {
        group.bench_function(format!("mcas_width_{}", n), |b| {
            b.iter_batched(
                || {
                    // build the cell pool off the timed path, in parallel,
                    // so pool construction never shows up in the measurement
                    (0..n)
                        .into_par_iter()
                        .map(|i| new_cell(i as u64))
                        .collect::<Vec<Cell<u64>>>()
                },
                |cells| {
                    let updates: Vec<_> = cells
                        .into_iter()
                        .enumerate()
                        .map(|(i, cell)| (cell, i as u64, i as u64 + 1))
                        .collect();
                    mcas(updates)
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, width_benchmark);
criterion_main!(benches);
