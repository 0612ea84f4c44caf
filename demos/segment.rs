//! Drives one rate segment and one scheduled normal phase against stdout.

use logspout::{
    BatchController, BatchWriter, ConsoleSink, CustomFormatter, LineGenerator, MetricsCollector,
    Scheduler,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

fn main() -> logspout::Result<()> {
    println!("=== Single Segment ===\n");
    single_segment()?;

    println!("\n=== Scheduled Normal Phase ===\n");
    scheduled_phase()?;
    Ok(())
}

fn lines(seed: u64) -> LineGenerator<CustomFormatter> {
    let formatter = CustomFormatter::new(
        "$timestamp [$log_level] $message",
        vec!["demo".to_string()],
        SmallRng::seed_from_u64(seed),
    );
    LineGenerator::new(formatter, Vec::new(), SmallRng::seed_from_u64(seed + 1))
}

fn single_segment() -> logspout::Result<()> {
    let mut lines = lines(1);
    let mut sink = ConsoleSink::new();
    let metrics = MetricsCollector::new();

    // ~20 lines over half a second
    let report = BatchController::new(100.0).run(
        0.004,
        Duration::from_millis(500),
        &mut lines,
        &mut sink,
        Some(&metrics),
    )?;

    println!(
        "\n{} lines in {} batches\n{}",
        report.logs,
        report.batches,
        metrics.get_stats().summary()
    );
    Ok(())
}

fn scheduled_phase() -> logspout::Result<()> {
    let metrics = Arc::new(MetricsCollector::new());
    let mut writer = BatchWriter::new(BatchController::new(100.0), lines(7), ConsoleSink::new())
        .with_metrics(metrics.clone());

    let outcome = Scheduler::new(Some(42)).random_segments(&mut writer, 2.0, 1.0, 0.001, 0.002, 0.2)?;

    println!("\nPhase ended: {:?}\n{}", outcome, metrics.get_stats());
    Ok(())
}
