//! Benchmark for OrderedHashMap vs standard HashMap.
//!
//! Compares persistent insert, get, remove and ordered iteration against
//! Rust's standard HashMap.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ordered_hamt::persistent::OrderedHashMap;
use std::collections::HashMap;
use std::hint::black_box;

// =============================================================================
// insert Benchmark
// =============================================================================

fn benchmark_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("OrderedHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut map = OrderedHashMap::new();
                    for index in 0..size {
                        map = map.insert(black_box(index), black_box(index * 2));
                    }
                    black_box(map)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("HashMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut map = HashMap::new();
                for index in 0..size {
                    map.insert(black_box(index), black_box(index * 2));
                }
                black_box(map)
            });
        });
    }

    group.finish();
}

// =============================================================================
// get Benchmark
// =============================================================================

fn benchmark_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("get");

    for size in [1_000, 10_000, 100_000] {
        let ordered_map: OrderedHashMap<i32, i32> = (0..size).map(|index| (index, index)).collect();
        let standard_map: HashMap<i32, i32> = (0..size).map(|index| (index, index)).collect();

        group.bench_with_input(
            BenchmarkId::new("OrderedHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut sum = 0;
                    for index in 0..size {
                        sum += ordered_map.get(black_box(&index)).copied().unwrap_or(0);
                    }
                    black_box(sum)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("HashMap", size), &size, |bencher, &size| {
            bencher.iter(|| {
                let mut sum = 0;
                for index in 0..size {
                    sum += standard_map.get(black_box(&index)).copied().unwrap_or(0);
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

// =============================================================================
// remove Benchmark
// =============================================================================

fn benchmark_remove(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("remove");

    for size in [1_000, 10_000] {
        let ordered_map: OrderedHashMap<i32, i32> = (0..size).map(|index| (index, index)).collect();

        // Removes every other key so the order chain is spliced in the middle
        group.bench_with_input(
            BenchmarkId::new("OrderedHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut map = ordered_map.clone();
                    for index in (0..size).step_by(2) {
                        map = map.remove(black_box(&index));
                    }
                    black_box(map)
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("HashMap", size), &size, |bencher, &size| {
            let standard_map: HashMap<i32, i32> = (0..size).map(|index| (index, index)).collect();
            bencher.iter_batched(
                || standard_map.clone(),
                |mut map| {
                    for index in (0..size).step_by(2) {
                        map.remove(black_box(&index));
                    }
                    black_box(map)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// =============================================================================
// iteration Benchmark
// =============================================================================

fn benchmark_iteration(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("iteration");

    for size in [1_000, 10_000, 100_000] {
        let ordered_map: OrderedHashMap<i32, i32> = (0..size).map(|index| (index, index)).collect();
        let standard_map: HashMap<i32, i32> = (0..size).map(|index| (index, index)).collect();

        group.bench_with_input(
            BenchmarkId::new("OrderedHashMap", size),
            &size,
            |bencher, _| {
                bencher.iter(|| black_box(ordered_map.values().copied().sum::<i32>()));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("OrderedHashMap::fold", size),
            &size,
            |bencher, _| {
                bencher.iter(|| black_box(ordered_map.fold(0, |sum, value, _| sum + value)));
            },
        );

        group.bench_with_input(BenchmarkId::new("HashMap", size), &size, |bencher, _| {
            bencher.iter(|| black_box(standard_map.values().copied().sum::<i32>()));
        });
    }

    group.finish();
}

// =============================================================================
// push Benchmark
// =============================================================================

fn benchmark_push(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("push");

    for group_size in [2, 8, 32] {
        group.bench_with_input(
            BenchmarkId::new("OrderedHashMap", group_size),
            &group_size,
            |bencher, &group_size| {
                bencher.iter(|| {
                    let mut map = OrderedHashMap::new();
                    for index in 0..1_000 {
                        map = map.push(black_box(index / group_size), black_box(index));
                    }
                    black_box(map)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// Criterion Group and Main
// =============================================================================

criterion_group!(
    benches,
    benchmark_insert,
    benchmark_get,
    benchmark_remove,
    benchmark_iteration,
    benchmark_push
);

criterion_main!(benches);
