//! # Generator Run Loop
//!
//! Alternates normal and peak traffic phases until the configured run time
//! is used up or shutdown is requested.
//!
//! ```text
//!     ┌──────────────── while within stop_after_seconds ───────────────┐
//!     │                                                                 │
//!     │  shutdown? ──Yes──► Interrupted                                 │
//!     │     │                                                           │
//!     │  normal: random_segments(duration_normal, max_seg,              │
//!     │                          rate_normal_min, rate_normal_max, exit)│
//!     │     │                                                           │
//!     │  peak:   random_rate(duration_peak, rate_normal_max, rate_peak) │
//!     │     │                                                           │
//!     │  log "Iteration N metrics"                                      │
//!     └─────────────────────────────────────────────────────────────────┘
//!              │
//!              ▼
//!     log final metrics, close sink (always)
//! ```

use super::batch::BatchWriter;
use super::metrics::{MetricsCollector, MetricsSnapshot};
use super::scheduler::{Scheduler, SegmentOutcome};
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::format::LogFormatter;
use crate::output::OutputSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Cloneable cancellation flag shared between a signal handler and a run.
///
/// Setting it never interrupts a batch in progress. The run loop and the
/// scheduler poll it between segments and batches.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Creates an untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Idempotent.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`ShutdownToken::trigger`] has been called on any clone.
    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// How a run that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The configured run time elapsed.
    Completed,
    /// Shutdown was requested.
    Interrupted,
}

/// Result of a successful [`Generator::run`].
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Why the run stopped.
    pub outcome: RunOutcome,
    /// Completed normal+peak iterations.
    pub iterations: u64,
    /// Final metrics.
    pub metrics: MetricsSnapshot,
}

/// Drives the scheduler through repeated normal and peak phases.
#[derive(Debug)]
pub struct Generator<F, S> {
    config: GeneratorConfig,
    scheduler: Scheduler,
    writer: BatchWriter<F, S>,
    metrics: Arc<MetricsCollector>,
    shutdown: ShutdownToken,
}

impl<F, S> Generator<F, S>
where
    F: LogFormatter,
    S: OutputSink,
{
    pub(crate) fn new(
        config: GeneratorConfig,
        scheduler: Scheduler,
        writer: BatchWriter<F, S>,
        metrics: Arc<MetricsCollector>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            config,
            scheduler,
            writer,
            metrics,
            shutdown,
        }
    }

    /// Token that stops this generator when triggered.
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Shared metrics handle for this run.
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// The sink lines are written to.
    pub fn sink(&self) -> &S {
        self.writer.sink()
    }

    /// Consumes the generator, returning its sink.
    pub fn into_sink(self) -> S {
        self.writer.into_sink()
    }

    /// Runs phases until the run limit passes or shutdown is requested.
    ///
    /// The final metrics are logged and the sink is closed whatever the
    /// outcome. A failed phase returns its error.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut iterations = 0;
        let result = self.run_phases(&mut iterations);

        let metrics = self.metrics.get_stats();
        info!("Final metrics: {}", metrics);

        let closed = self.writer.sink_mut().close();
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("Failed to close output after error: {}", close_err);
                }
                return Err(e);
            }
        };
        closed?;

        Ok(RunSummary {
            outcome,
            iterations,
            metrics,
        })
    }

    fn run_phases(&mut self, iterations: &mut u64) -> Result<RunOutcome> {
        let start = Instant::now();
        let limit = self.config.run_limit();
        let cfg = &self.config;

        while limit.map_or(true, |limit| start.elapsed() < limit) {
            if self.shutdown.is_triggered() {
                info!("Exiting main loop due to interrupt.");
                return Ok(RunOutcome::Interrupted);
            }

            let normal = self
                .scheduler
                .random_segments(
                    &mut self.writer,
                    cfg.duration_normal,
                    cfg.max_segment_duration_normal,
                    cfg.rate_normal_min,
                    cfg.rate_normal_max,
                    cfg.base_exit_probability,
                )
                .map_err(|e| {
                    error!("Failed during normal log generation period.");
                    e
                })?;
            if normal == SegmentOutcome::Interrupted {
                info!("Exiting main loop due to interrupt.");
                return Ok(RunOutcome::Interrupted);
            }

            let peak = self
                .scheduler
                .random_rate(
                    &mut self.writer,
                    cfg.duration_peak,
                    cfg.rate_normal_max,
                    cfg.rate_peak,
                )
                .map_err(|e| {
                    error!("Failed during peak log generation period.");
                    e
                })?;
            if peak == SegmentOutcome::Interrupted {
                info!("Exiting main loop due to interrupt.");
                return Ok(RunOutcome::Interrupted);
            }

            *iterations += 1;
            info!("Iteration {} metrics: {}", iterations, self.metrics.get_stats());
        }

        Ok(RunOutcome::Completed)
    }
}
