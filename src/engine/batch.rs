//! # Adaptive Batch Controller
//!
//! Produces log lines at a fixed byte rate for a fixed duration. The target
//! rate is converted to lines per second and fed into a fresh
//! [`TokenBucket`]; lines are then generated in batches whose size adapts
//! to how much slack the previous batches left.
//!
//! ```text
//!     ┌────────── loop until end_time ──────────┐
//!     │                                          │
//!     │  consume(batch) ──No──► sleep 0.05s ─────┤
//!     │       │                                  │
//!     │      Yes                                 │
//!     │       ▼                                  │
//!     │  generate batch ──► sink.write ──Err──►  abort
//!     │       │                                  │
//!     │       ▼                                  │
//!     │  slack = expected - elapsed              │
//!     │   slack > 0 : idle += slack              │
//!     │               idle > 0.05s → batch ×1.2  │
//!     │   slack = 0 : batch ×1.5                 │
//!     │  clamp batch to [1, lines/s]             │
//!     │  sleep(slack) ───────────────────────────┘
//!     └──────────────────────────────────────────┘
//! ```
//!
//! Batch size only ever grows within a run.

use super::bucket::TokenBucket;
use super::metrics::MetricsCollector;
use super::runner::ShutdownToken;
use super::scheduler::SegmentWriter;
use super::utils::{sleep_secs, BYTES_PER_MB};
use crate::error::Result;
use crate::format::{LineGenerator, LogFormatter};
use crate::output::OutputSink;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Starting batch size before clamping to the line rate.
pub const INITIAL_BATCH_SIZE: u64 = 1024;

/// Idle time that must accumulate before a gentle batch increase.
pub const IDLE_THRESHOLD_SECS: f64 = 0.05;

/// Growth factor applied once enough idle time accumulates.
pub const GROWTH_WHEN_IDLE: f64 = 1.2;

/// Growth factor applied when a batch overruns its time slot.
pub const GROWTH_WHEN_BEHIND: f64 = 1.5;

/// Back-off after the bucket declines a batch.
pub const RETRY_SLEEP_SECS: f64 = 0.05;

/// Back-off when the line rate is zero.
pub const IDLE_RATE_SLEEP_SECS: f64 = 0.1;

/// Stand-in length for segments that do not fit an `Instant`.
const UNBOUNDED_RUN: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Line size assumed when the configured estimate is unusable.
pub const DEFAULT_LINE_SIZE: f64 = 100.0;

/// Converts a byte rate into line-generation runs gated by a token bucket.
#[derive(Debug, Clone)]
pub struct BatchController {
    line_size: f64,
    shutdown: Option<ShutdownToken>,
}

/// What a single [`BatchController::run`] produced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatchReport {
    /// Lines written.
    pub logs: u64,

    /// Bytes written, one newline per line included.
    pub bytes: u64,

    /// Successful sink writes.
    pub batches: u64,

    /// Batch size at the end of the run.
    pub final_batch_size: u64,

    /// Whether the run stopped early because shutdown was requested.
    pub interrupted: bool,
}

/// Adaptive sizing state for one run.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchState {
    batch_size: u64,
    accumulated_idle: f64,
    ceiling: f64,
}

impl BatchState {
    pub(crate) fn new(tokens_per_second: f64) -> Self {
        let mut state = Self {
            batch_size: INITIAL_BATCH_SIZE,
            accumulated_idle: 0.0,
            ceiling: tokens_per_second,
        };
        state.batch_size = state.clamp(INITIAL_BATCH_SIZE as f64);
        state
    }

    #[inline]
    pub(crate) fn batch_size(&self) -> u64 {
        self.batch_size
    }

    /// Time one batch should take at the target rate.
    #[inline]
    pub(crate) fn expected_batch_time(&self) -> f64 {
        self.batch_size as f64 / self.ceiling
    }

    /// Feeds back one successful batch and returns how long to sleep.
    pub(crate) fn adjust(&mut self, elapsed: f64, expected: f64) -> f64 {
        let slack = (expected - elapsed).max(0.0);
        let mut target = self.batch_size as f64;

        if slack > 0.0 {
            self.accumulated_idle += slack;
            if self.accumulated_idle > IDLE_THRESHOLD_SECS {
                target *= GROWTH_WHEN_IDLE;
                self.accumulated_idle = 0.0;
                debug!("Increasing batch size to: {}", self.clamp(target));
            }
        } else {
            target *= GROWTH_WHEN_BEHIND;
            debug!("Rapidly increasing batch size to: {}", self.clamp(target));
        }

        self.batch_size = self.clamp(target);
        slack
    }

    /// `max(1, min(size, ceiling))`, truncated.
    #[inline]
    fn clamp(&self, size: f64) -> u64 {
        size.min(self.ceiling).max(1.0) as u64
    }
}

impl BatchController {
    /// Creates a controller for lines of roughly `line_size_estimate` bytes.
    ///
    /// A non-positive estimate is replaced by [`DEFAULT_LINE_SIZE`].
    pub fn new(line_size_estimate: f64) -> Self {
        let line_size = if line_size_estimate.is_finite() && line_size_estimate > 0.0 {
            line_size_estimate
        } else {
            warn!(
                "log_line_size_estimate is {}, defaulting to {} bytes.",
                line_size_estimate, DEFAULT_LINE_SIZE
            );
            DEFAULT_LINE_SIZE
        };
        Self {
            line_size,
            shutdown: None,
        }
    }

    /// Stops runs between batches once `token` is triggered.
    pub fn with_shutdown(mut self, token: ShutdownToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Line size used for rate conversion.
    pub fn line_size(&self) -> f64 {
        self.line_size
    }

    /// Lines per second needed to reach `rate_mbs`.
    #[inline]
    pub fn tokens_per_second(&self, rate_mbs: f64) -> f64 {
        rate_mbs * BYTES_PER_MB / self.line_size
    }

    /// Generates lines at `rate_mbs` for `duration`, writing them to `sink`.
    ///
    /// Totals are reported to `metrics` once, when the run ends. If the sink
    /// fails, the batches written before the failure are still reported and
    /// the error is returned.
    pub fn run<F, S>(
        &self,
        rate_mbs: f64,
        duration: Duration,
        lines: &mut LineGenerator<F>,
        sink: &mut S,
        metrics: Option<&MetricsCollector>,
    ) -> Result<BatchReport>
    where
        F: LogFormatter,
        S: OutputSink,
    {
        info!(
            "Writing logs at rate: {:.4} MB/s for {:.2} seconds",
            rate_mbs,
            duration.as_secs_f64()
        );

        let tokens_per_second = self.tokens_per_second(rate_mbs);
        let bucket = TokenBucket::new(tokens_per_second, tokens_per_second);
        let mut state = BatchState::new(tokens_per_second);
        let mut report = BatchReport::default();
        let end_time = deadline(Instant::now(), duration);

        let outcome = loop {
            let batch_start = Instant::now();
            if batch_start >= end_time {
                break Ok(());
            }
            if self.shutdown_requested() {
                report.interrupted = true;
                break Ok(());
            }

            if tokens_per_second <= 0.0 {
                if !bucket.consume(1.0) {
                    sleep_capped(IDLE_RATE_SLEEP_SECS, end_time);
                }
                continue;
            }

            let size = state.batch_size();
            let expected = state.expected_batch_time();

            if !bucket.consume(size as f64) {
                sleep_capped(RETRY_SLEEP_SECS, end_time);
                continue;
            }

            let batch: Vec<String> = (0..size).map(|_| lines.next_line()).collect();
            let bytes: u64 = batch.iter().map(|line| line.len() as u64 + 1).sum();

            if let Err(e) = sink.write(&batch) {
                error!("Failed to write log lines to output: {}", e);
                break Err(e);
            }
            report.logs += size;
            report.bytes += bytes;
            report.batches += 1;

            let elapsed = batch_start.elapsed().as_secs_f64();
            let slack = state.adjust(elapsed, expected);
            sleep_capped(slack, end_time);
        };

        report.final_batch_size = state.batch_size();
        let stats = bucket.stats();
        debug!(
            "Segment finished: {} logs, {} bytes in {} batches ({} token rejections)",
            report.logs, report.bytes, report.batches, stats.rejected
        );

        if let Some(metrics) = metrics {
            metrics.update(report.logs, report.bytes);
        }

        outcome.map(|()| report)
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(ShutdownToken::is_triggered)
    }
}

/// End of a run that starts at `start`. Durations too long for an `Instant`
/// are treated as a century.
fn deadline(start: Instant, duration: Duration) -> Instant {
    start
        .checked_add(duration)
        .or_else(|| start.checked_add(UNBOUNDED_RUN))
        .unwrap_or(start)
}

fn sleep_capped(seconds: f64, end_time: Instant) {
    let remaining = end_time.saturating_duration_since(Instant::now()).as_secs_f64();
    sleep_secs(seconds.min(remaining));
}

/// A [`BatchController`] bundled with everything it writes through.
///
/// This is what the scheduler drives: each segment becomes one
/// [`BatchController::run`] call against the same line generator, sink and
/// metrics.
#[derive(Debug)]
pub struct BatchWriter<F, S> {
    controller: BatchController,
    lines: LineGenerator<F>,
    sink: S,
    metrics: Option<Arc<MetricsCollector>>,
}

impl<F, S> BatchWriter<F, S>
where
    F: LogFormatter,
    S: OutputSink,
{
    /// Bundles a controller with its line source and sink.
    pub fn new(controller: BatchController, lines: LineGenerator<F>, sink: S) -> Self {
        Self {
            controller,
            lines,
            sink,
            metrics: None,
        }
    }

    /// Reports every segment to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The sink lines are written to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink, used to close it when a run ends.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Splits the writer back into its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<F, S> SegmentWriter for BatchWriter<F, S>
where
    F: LogFormatter,
    S: OutputSink,
{
    fn write_segment(&mut self, rate_mbs: f64, duration: Duration) -> Result<()> {
        self.controller
            .run(
                rate_mbs,
                duration,
                &mut self.lines,
                &mut self.sink,
                self.metrics.as_deref(),
            )
            .map(|_| ())
    }
}
