//! # Line Generation Benchmarks
//!
//! Per-line cost of the formatters, which bounds the highest rate a single
//! generator can sustain.
//!
//! Run with: `cargo bench --bench line_generation`

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use logspout::{
    CustomFormatter, HttpFormatter, LineGenerator, Template, UserAgentPool, DEFAULT_LOG_LEVELS,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn levels() -> Vec<String> {
    DEFAULT_LOG_LEVELS.iter().map(|l| l.to_string()).collect()
}

fn http_lines(pool_size: usize) -> LineGenerator<HttpFormatter> {
    let mut rng = SmallRng::seed_from_u64(1);
    let agents = UserAgentPool::new(&[], &[], pool_size, &mut rng);
    let codes = vec!["200".to_string(), "404".to_string(), "500".to_string()];
    let formatter = HttpFormatter::new(codes, agents, rng);
    LineGenerator::new(formatter, levels(), SmallRng::seed_from_u64(2))
}

fn custom_lines(apps: Vec<String>) -> LineGenerator<CustomFormatter> {
    let formatter = CustomFormatter::new(
        "$timestamp [$log_level] $message",
        apps,
        SmallRng::seed_from_u64(3),
    );
    LineGenerator::new(formatter, levels(), SmallRng::seed_from_u64(4))
}

/// One line through each formatter
fn bench_next_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_line");
    group.throughput(Throughput::Elements(1));

    for pool_size in [1, 100] {
        group.bench_with_input(
            BenchmarkId::new("http", pool_size),
            &pool_size,
            |b, &pool_size| {
                let mut lines = http_lines(pool_size);
                b.iter(|| std::hint::black_box(lines.next_line()));
            },
        );
    }

    group.bench_function("custom", |b| {
        let mut lines = custom_lines(Vec::new());
        b.iter(|| std::hint::black_box(lines.next_line()));
    });

    group.bench_function("custom_with_apps", |b| {
        let mut lines = custom_lines(vec!["billing".to_string(), "auth".to_string()]);
        b.iter(|| std::hint::black_box(lines.next_line()));
    });

    group.finish();
}

/// A full initial batch, as written at the start of every segment
fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");

    for size in [64usize, 1024] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("http", size), &size, |b, &size| {
            let mut lines = http_lines(100);
            b.iter(|| {
                let batch: Vec<String> = (0..size).map(|_| lines.next_line()).collect();
                std::hint::black_box(batch)
            });
        });
    }

    group.finish();
}

/// Template parsing happens once per run, rendering once per line
fn bench_template(c: &mut Criterion) {
    let mut group = c.benchmark_group("template");
    let source = "$timestamp [${log_level}] $message ($$)";

    group.bench_function("parse", |b| {
        b.iter(|| std::hint::black_box(Template::parse(source)));
    });

    group.bench_function("render", |b| {
        b.iter_batched(
            || Template::parse(source).unwrap(),
            |template| {
                std::hint::black_box(template.render(
                    "2024-05-01T10:30:00.000000+00:00",
                    "INFO",
                    "User logged in",
                ))
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_next_line, bench_batch, bench_template);
criterion_main!(benches);
