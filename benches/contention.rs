#![allow(dead_code)]

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use mcas::{mcas, new_cell, Cell};
use rand::{Rng, SeedableRng};
use std::sync::Arc;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const THREADS: u64 = 24;
const PER_THREAD: u64 = 50_000;
const POOL_SIZE: usize = 24_000;

/// `THREADS` threads each perform `PER_THREAD` 2-cell `mcas` ops against a
/// shared pool of `POOL_SIZE` cells, picking a uniformly random pair each
/// time. Mirrors the contention shape of a high-fan-in counter-increment
/// workload: lots of cells, small per-op footprint, heavy overlap only by
/// chance.
fn contention_sum(pool: Arc<Box<[Cell<u32>]>>) -> usize {
    let mut handles = Vec::new();
    for thread in 0..THREADS {
        let pool = pool.clone();
        let h = std::thread::spawn(move || {
            let s = thread as u32;
            let seed = [s + 1, s + 2, s + 3, s + 4];
            let mut rng = rand::XorShiftRng::from_seed(seed);
            let mut num_succeeded = 0usize;
            for _ in 0..PER_THREAD {
                let i = rng.gen_range(0, pool.len());
                let mut j = rng.gen_range(0, pool.len());
                while j == i {
                    j = rng.gen_range(0, pool.len());
                }
                let a = &pool[i];
                let b = &pool[j];
                // read-compute-cas: no snapshot isolation, so a concurrent
                // writer can make our `old` stale between the two reads and
                // the mcas call; that just shows up as a failed attempt.
                let old_a = mcas::load(a);
                let old_b = mcas::load(b);
                if mcas(vec![
                    (a.clone(), old_a, old_a + 1),
                    (b.clone(), old_b, old_b + 1),
                ]) {
                    num_succeeded += 1;
                }
            }
            num_succeeded
        });
        handles.push(h);
    }

    handles.into_iter().map(|h| h.join().unwrap()).sum()
}

fn contention_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");
    group.throughput(Throughput::Elements(THREADS * PER_THREAD));
    group.bench_function("mcas_2ary_sum", |b| {
        b.iter_batched(
            || {
                Arc::new(
                    (0..POOL_SIZE)
                        .map(|_| new_cell(0u32))
                        .collect::<Vec<_>>()
                        .into_boxed_slice(),
                )
            },
            contention_sum,
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(benches, contention_benchmark);
criterion_main!(benches);
