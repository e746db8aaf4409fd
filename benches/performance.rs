//! Performance benchmarks for the hot paths: online statistics, the
//! benchmark accumulator, de-duplication, duration parsing and bandit
//! selection.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::time::Duration;
use xkit::bandit::{AnnealingEpsilonGreedy, EpsilonGreedy, Strategy};
use xkit::stats::{Benchmark, Statistics};
use xkit::unique;
use xkit::utils::{format_duration, parse_duration};

fn create_samples(count: usize) -> Vec<f64> {
    (0..count).map(|i| 10.0 + (i % 97) as f64 * 0.5).collect()
}

fn create_durations(count: usize) -> Vec<Duration> {
    (0..count).map(|i| Duration::from_micros(100 + (i as u64 % 650))).collect()
}

fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics");

    for size in [10, 100, 1000, 10000] {
        let samples = create_samples(size);
        group.bench_with_input(BenchmarkId::new("update", size), &samples, |b, samples| {
            b.iter(|| {
                let stats = Statistics::new();
                stats.update(black_box(samples));
                black_box(stats.stddev())
            })
        });
    }

    let stats = Statistics::new();
    stats.update(&create_samples(1000));
    group.bench_function("serialize", |b| b.iter(|| black_box(stats.serialize())));

    group.finish();
}

fn bench_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("benchmark");

    for size in [10, 100, 1000] {
        let durations = create_durations(size);
        group.bench_with_input(BenchmarkId::new("update", size), &durations, |b, durations| {
            b.iter(|| {
                let bench = Benchmark::new();
                bench.update(black_box(durations));
                black_box(bench.throughput())
            })
        });
    }

    group.finish();
}

fn bench_unique(c: &mut Criterion) {
    let mut group = c.benchmark_group("unique");

    let ints: Vec<i64> = (0..10000).map(|i| i % 1000).collect();
    group.bench_function("int64s", |b| b.iter(|| black_box(unique::int64s(black_box(&ints)))));

    let words: Vec<String> = (0..10000).map(|i| format!("word-{}", i % 500)).collect();
    group.bench_function("strings", |b| b.iter(|| black_box(unique::strings(black_box(&words)))));

    group.finish();
}

fn bench_durations(c: &mut Criterion) {
    let mut group = c.benchmark_group("duration");

    group.bench_function("parse", |b| b.iter(|| parse_duration(black_box("2h45m10s"))));
    group.bench_function("format", |b| {
        b.iter(|| format_duration(black_box(Duration::from_micros(1_234_567))))
    });

    group.finish();
}

fn bench_bandit(c: &mut Criterion) {
    let mut group = c.benchmark_group("bandit");

    group.bench_function("epsilon_greedy", |b| {
        let mut strategy = EpsilonGreedy::with_seed(0.1, 42);
        strategy.init(10);
        b.iter(|| {
            if let Some(arm) = strategy.select() {
                let _ = strategy.update(arm, (arm % 3) as f64);
            }
        })
    });

    group.bench_function("annealing_epsilon_greedy", |b| {
        let mut strategy = AnnealingEpsilonGreedy::with_seed(42);
        strategy.init(10);
        b.iter(|| {
            if let Some(arm) = strategy.select() {
                let _ = strategy.update(arm, (arm % 3) as f64);
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_statistics,
    bench_benchmark,
    bench_unique,
    bench_durations,
    bench_bandit
);
criterion_main!(benches);
