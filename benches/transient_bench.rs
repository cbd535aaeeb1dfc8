//! Benchmark for TransientOrderedHashMap.
//!
//! Compares batch updates through a transient against the same updates on
//! the persistent map and on the standard HashMap.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ordered_hamt::persistent::OrderedHashMap;
use std::collections::HashMap;
use std::hint::black_box;

// =============================================================================
// Batch insert Benchmarks
// =============================================================================

fn benchmark_transient_insert(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_insert");

    for size in [1_000, 10_000, 100_000] {
        group.bench_with_input(
            BenchmarkId::new("TransientOrderedHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut transient = OrderedHashMap::new().begin_mutation();
                    for index in 0..size {
                        transient.insert(black_box(index), black_box(index * 2));
                    }
                    black_box(transient.persistent())
                });
            },
        );

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
// Batch update Benchmarks
// =============================================================================

fn benchmark_transient_update(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_update");

    for size in [1_000, 10_000, 100_000] {
        let ordered_map: OrderedHashMap<i32, i32> = (0..size).map(|index| (index, index)).collect();

        // The first touch of each node copies it, later touches mutate it
        group.bench_with_input(
            BenchmarkId::new("TransientOrderedHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    black_box(ordered_map.mutate(|transient| {
                        for index in (0..size).step_by(10) {
                            transient.insert(black_box(index), black_box(999));
                        }
                    }))
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("OrderedHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut map = ordered_map.clone();
                    for index in (0..size).step_by(10) {
                        map = map.insert(black_box(index), black_box(999));
                    }
                    black_box(map)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// Mixed batch Benchmarks
// =============================================================================

fn benchmark_transient_mixed(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("transient_mixed");

    for size in [1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("TransientOrderedHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let map = OrderedHashMap::new().mutate(|transient| {
                        for index in 0..size {
                            transient.insert(black_box(index), index);
                        }
                        for index in (0..size).step_by(3) {
                            transient.remove(black_box(&index));
                        }
                        for index in (0..size).step_by(5) {
                            transient.append(black_box(index), index + 1);
                        }
                    });
                    black_box(map)
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("OrderedHashMap", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut map = OrderedHashMap::new();
                    for index in 0..size {
                        map = map.insert(black_box(index), index);
                    }
                    for index in (0..size).step_by(3) {
                        map = map.remove(black_box(&index));
                    }
                    for index in (0..size).step_by(5) {
                        map = map.append(black_box(index), index + 1);
                    }
                    black_box(map)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_transient_insert,
    benchmark_transient_update,
    benchmark_transient_mixed
);

criterion_main!(benches);
