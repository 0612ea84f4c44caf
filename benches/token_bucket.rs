//! # Token Bucket Benchmarks
//!
//! Cost of the admission gate that paces every batch.
//!
//! Run with: `cargo bench --bench token_bucket`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use logspout::{MetricsCollector, TokenBucket};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Single-threaded consume of various batch sizes
fn bench_consume(c: &mut Criterion) {
    let mut group = c.benchmark_group("consume");

    for n in [1.0, 64.0, 1024.0] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let bucket = TokenBucket::new(1e12, 1e12);
            b.iter(|| std::hint::black_box(bucket.consume(n)));
        });
    }

    group.finish();
}

/// Consume against an empty bucket, the retry path of a saturated segment
fn bench_rejection(c: &mut Criterion) {
    let mut group = c.benchmark_group("rejection");

    group.bench_function("empty_bucket", |b| {
        let bucket = TokenBucket::new(0.001, 1.0);
        bucket.consume(1.0);
        b.iter(|| std::hint::black_box(bucket.consume(1.0)));
    });

    group.bench_function("stats", |b| {
        let bucket = TokenBucket::new(1000.0, 1000.0);
        b.iter(|| std::hint::black_box(bucket.stats()));
    });

    group.finish();
}

/// Several threads sharing one bucket
fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("contention");

    for num_threads in [2, 4, 8] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                b.iter_custom(|iters| {
                    let mut total_duration = Duration::ZERO;

                    for _ in 0..iters {
                        let bucket = Arc::new(TokenBucket::new(1e9, 1e9));
                        let start = Instant::now();

                        let handles: Vec<_> = (0..num_threads)
                            .map(|_| {
                                let bucket = bucket.clone();
                                thread::spawn(move || {
                                    for _ in 0..1000 {
                                        bucket.consume(1.0);
                                    }
                                })
                            })
                            .collect();

                        for handle in handles {
                            handle.join().unwrap();
                        }

                        total_duration += start.elapsed();
                    }

                    total_duration
                });
            },
        );
    }

    group.finish();
}

/// Metrics updates, taken once per segment
fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("metrics");

    group.bench_function("update", |b| {
        let metrics = MetricsCollector::new();
        b.iter(|| metrics.update(1024, 102_400));
    });

    group.bench_function("get_stats", |b| {
        let metrics = MetricsCollector::new();
        for _ in 0..1000 {
            metrics.update(1024, 102_400);
        }
        b.iter(|| std::hint::black_box(metrics.get_stats()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_consume,
    bench_rejection,
    bench_contention,
    bench_metrics
);
criterion_main!(benches);
