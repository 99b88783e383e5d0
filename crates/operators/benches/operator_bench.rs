//! Benchmarks for beck operators.
//!
//! Target: per-batch cost proportional to batch size, not collection size.

use beck_core::{ChangeBatch, ChangeRecord};
use beck_operators::{Filter, GroupBy, JoinMany};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn add_batch(size: u64) -> ChangeBatch<u64, u64> {
    (0..size).map(|k| ChangeRecord::add(k, k)).collect()
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter/process");

    for size in [1u64, 10, 100, 1000] {
        let batch = add_batch(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            let mut filter = Filter::new(|v: &u64| v % 2 == 0);
            b.iter(|| filter.process(black_box(batch)))
        });
    }

    group.finish();
}

fn bench_group_by(c: &mut Criterion) {
    let mut group = c.benchmark_group("group/process");

    for size in [10u64, 100, 1000] {
        let batch = add_batch(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            let mut groups = GroupBy::new(|v: &u64| v % 16);
            b.iter(|| groups.process(black_box(batch)))
        });
    }

    group.finish();
}

fn bench_join_single_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("join/single_right_update");

    for size in [100u64, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut join = JoinMany::full_join(|v: &u64| v % 16);
            let left: ChangeBatch<u64, u64> = (0..16).map(|k| ChangeRecord::add(k, k)).collect();
            join.on_left_batch(&left);
            join.on_right_batch(&add_batch(size));

            // One item moves between groups; cost must not scale with the
            // total collection size.
            let update: ChangeBatch<u64, u64> =
                [ChangeRecord::update(0, 1, 0)].into_iter().collect();
            b.iter(|| join.on_right_batch(black_box(&update)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_filter, bench_group_by, bench_join_single_update);
criterion_main!(benches);
