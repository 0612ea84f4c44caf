//! # logspout - Synthetic Log Traffic Generator
//!
//! Produces realistic log lines at a controllable, time-varying byte rate,
//! for exercising log collectors, parsers and storage. It does not analyse
//! logs; it only writes plausible ones at the rate you ask for.
//!
//! ## How Traffic Is Shaped
//!
//! A run alternates two phases until its time is up:
//!
//! ```text
//!     rate (MB/s)
//!       │                   ┌──┐
//!  peak │               ┌───┘  └──┐                 ┌───┐
//!       │   ┌─┐         │  peak   │     ┌┐  ┌─┐     │   │
//!  max  │ ┌─┘ └┐ ┌──┐   │         │   ┌─┘└──┘ │     │   │
//!       │ │    └─┘  │   │         │   │       │     │   │
//!  min  │─┘ normal  └───┘         └───┘ normal└─────┘   └──
//!       └───────────────────────────────────────────────► time
//! ```
//!
//! - **Normal** phases are split into random slices, each with a random
//!   rate in `[rate_normal_min, rate_normal_max]`, and may end early.
//! - **Peak** phases run at random rates in `[rate_normal_max, rate_peak]`.
//!
//! Within every slice, a token bucket converts the byte rate into lines per
//! second and an adaptive batch controller keeps the line rate on target
//! without busy-waiting.
//!
//! ## Features
//!
//! - 🪣 **Token Bucket Gate** - Lazy refill, no background thread
//! - 📈 **Adaptive Batching** - Batch size grows until sleeps are cheap
//! - 🎲 **Reproducible Randomness** - Seed the whole run from config
//! - 🌐 **HTTP or Custom Layout** - Access-log lines or your own template
//! - 🔄 **File Rotation** - Size-based, with timestamped archives
//! - 📊 **Throughput Metrics** - Totals and per-segment MB/s
//! - 🛑 **Graceful Shutdown** - Interrupts are honoured between segments
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use logspout::{ConfigFile, GeneratorBuilder};
//!
//! let config = ConfigFile::load("config.yaml")?;
//! let mut generator = GeneratorBuilder::new(config).build()?;
//!
//! let summary = generator.run()?;
//! println!("{}", summary.metrics);
//! # Ok::<(), logspout::Error>(())
//! ```
//!
//! ### Driving a Single Segment
//!
//! ```rust
//! use logspout::{BatchController, ConsoleSink, CustomFormatter, LineGenerator, MetricsCollector};
//! use rand::SeedableRng;
//! use std::time::Duration;
//!
//! let rng = rand::rngs::SmallRng::seed_from_u64(1);
//! let formatter = CustomFormatter::new("$log_level $message", Vec::new(), rng.clone());
//! let mut lines = LineGenerator::new(formatter, Vec::new(), rng);
//! let mut sink = ConsoleSink::with_writer(Vec::new());
//! let metrics = MetricsCollector::new();
//!
//! BatchController::new(100.0)
//!     .run(0.001, Duration::from_millis(50), &mut lines, &mut sink, Some(&metrics))?;
//!
//! assert!(metrics.get_stats().total_logs > 0);
//! # Ok::<(), logspout::Error>(())
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │        Generator        │
//!                    │  normal / peak phases   │
//!                    └──────────┬──────────────┘
//!                               │
//!                    ┌──────────▼──────────────┐
//!                    │        Scheduler        │
//!                    ├─────────────────────────┤
//!                    │  • random_segments()    │
//!                    │  • random_rate()        │
//!                    └──────────┬──────────────┘
//!                               │ (rate, duration)
//!                    ┌──────────▼──────────────┐
//!                    │    BatchController      │
//!                    └──┬─────────┬─────────┬──┘
//!                       │         │         │
//!          ┌────────────▼──┐ ┌────▼─────┐ ┌─▼────────────┐
//!          │ Token Bucket  │ │ Formatter│ │  OutputSink  │
//!          └───────────────┘ └──────────┘ └──────┬───────┘
//!                                                │
//!                                   ┌────────────▼─────────┐
//!                                   │   MetricsCollector   │
//!                                   └──────────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! One run drives its segments sequentially. `TokenBucket` and
//! `MetricsCollector` are still safe to share across threads, so several
//! generators may report into one `Arc<MetricsCollector>`.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod config;
mod engine;
mod error;
mod format;
mod output;

pub use config::{apply_env_overrides, ConfigFile, GeneratorConfig};
pub use engine::{
    bytes_to_mb, seeded_rng, sleep_secs, with_thousands, BatchController, BatchReport,
    BatchWriter, BucketStats, Generator, MetricsCollector, MetricsSnapshot, RateChange,
    RunOutcome, RunSummary, Scheduler, SegmentOutcome, SegmentWriter, ShutdownToken,
    TokenBucket, BYTES_PER_MB, DEFAULT_LINE_SIZE, GROWTH_WHEN_BEHIND, GROWTH_WHEN_IDLE,
    IDLE_RATE_SLEEP_SECS, IDLE_THRESHOLD_SECS, INITIAL_BATCH_SIZE, RETRY_SLEEP_SECS,
};
pub use error::{Error, Result};
pub use format::{
    random_ipv4, CustomFormatter, Formatter, HttpFormatter, LineGenerator, LogFormatter,
    Template, TemplateError, UserAgentPool, DEFAULT_LOG_LEVELS, DEFAULT_STATUS,
    FALLBACK_USER_AGENT, MESSAGES,
};
pub use output::{rotated_path, ConsoleSink, FileSink, OutputSink, Sink};

use std::sync::Arc;

/// A metrics collector wrapped in `Arc` for sharing between generators.
///
/// # Example
/// ```rust
/// use logspout::{MetricsCollector, SharedMetrics};
/// use std::sync::Arc;
///
/// let shared: SharedMetrics = Arc::new(MetricsCollector::new());
/// let clone = shared.clone();
/// std::thread::spawn(move || clone.update(1, 100)).join().unwrap();
/// assert_eq!(shared.get_stats().total_logs, 1);
/// ```
pub type SharedMetrics = Arc<MetricsCollector>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum supported Rust version.
pub const MSRV: &str = "1.74.0";

/// Prelude module for convenient imports.
///
/// ```rust
/// use logspout::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for building and running a generator.
    //!
    //! # Example
    //! ```rust
    //! use logspout::prelude::*;
    //!
    //! let bucket = TokenBucket::new(10.0, 10.0);
    //! let token = ShutdownToken::new();
    //! assert!(bucket.consume(1.0));
    //! assert!(!token.is_triggered());
    //! ```

    pub use crate::{
        ConfigFile, Error, Formatter, Generator, GeneratorBuilder, GeneratorConfig,
        LogFormatter, MetricsCollector, MetricsSnapshot, OutputSink, Result, RunOutcome,
        RunSummary, SegmentOutcome, SharedMetrics, ShutdownToken, Sink, TokenBucket,
    };
}

/// Builder for a [`Generator`] from a loaded configuration.
///
/// # Example
///
/// ```rust,no_run
/// use logspout::{ConfigFile, GeneratorBuilder, MetricsCollector, ShutdownToken};
/// use std::sync::Arc;
///
/// let config = ConfigFile::load("config.yaml")?;
/// let token = ShutdownToken::new();
/// let metrics = Arc::new(MetricsCollector::new());
///
/// let mut generator = GeneratorBuilder::new(config)
///     .shutdown(token.clone())
///     .metrics(metrics.clone())
///     .seed(42)
///     .build()?;
///
/// generator.run()?;
/// # Ok::<(), logspout::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct GeneratorBuilder {
    config: ConfigFile,
    metrics: Option<SharedMetrics>,
    shutdown: Option<ShutdownToken>,
    seed: Option<u64>,
}

impl GeneratorBuilder {
    /// Starts a builder for `config`.
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            metrics: None,
            shutdown: None,
            seed: None,
        }
    }

    /// Reports into an existing collector instead of a fresh one.
    pub fn metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Stops the generator when `token` is triggered.
    pub fn shutdown(mut self, token: ShutdownToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Overrides the configured seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the formatter and sink named by the configuration.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when the output file cannot be
    /// opened.
    pub fn build(self) -> Result<Generator<Formatter, Sink>> {
        self.config.validate()?;
        let formatter = Formatter::from_config(&self.config, self.effective_seed());
        let sink = Sink::from_config(&self.config.settings)?;
        Ok(self.assemble(formatter, sink))
    }

    /// Builds a generator around a caller-supplied formatter and sink.
    ///
    /// The configuration is validated here, so settings changed after
    /// loading are checked too.
    pub fn build_with<F, S>(self, formatter: F, sink: S) -> Result<Generator<F, S>>
    where
        F: LogFormatter,
        S: OutputSink,
    {
        self.config.validate()?;
        Ok(self.assemble(formatter, sink))
    }

    fn assemble<F, S>(self, formatter: F, sink: S) -> Generator<F, S>
    where
        F: LogFormatter,
        S: OutputSink,
    {
        let seed = self.effective_seed();
        let settings = self.config.settings.clone();
        let shutdown = self.shutdown.unwrap_or_default();
        let metrics = self.metrics.unwrap_or_default();

        let lines = LineGenerator::new(formatter, self.config.levels(), seeded_rng(seed, 1));
        let controller =
            BatchController::new(settings.log_line_size_estimate).with_shutdown(shutdown.clone());
        let writer = BatchWriter::new(controller, lines, sink).with_metrics(metrics.clone());
        let scheduler = Scheduler::new(seed)
            .with_rate_change(settings.rate_change())
            .with_shutdown(shutdown.clone());

        Generator::new(settings, scheduler, writer, metrics, shutdown)
    }

    fn effective_seed(&self) -> Option<u64> {
        self.seed.or(self.config.settings.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
CONFIG:
  duration_normal: 1
  duration_peak: 1
  rate_normal_min: 0.0001
  rate_normal_max: 0.0002
  rate_peak: 0.0003
  log_line_size_estimate: 100
  user_agent_pool_size: 5
  max_segment_duration_normal: 1
  base_exit_probability: 0.0
  rate_change_probability: 0.0
  rate_change_max_percentage: 0.0
  write_to_file: false
  log_file_path: unused.log
  log_rotation_enabled: false
  log_rotation_size: 1
  http_format_logs: false
  stop_after_seconds: 0
  custom_app_names: []
  custom_log_format: "$message"
  logging_level: INFO
  seed: 9
"#;

    #[test]
    fn test_version_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(MSRV, "1.74.0");
    }

    #[test]
    fn test_builder_picks_configured_output() {
        let config = ConfigFile::from_yaml_str(CONFIG).unwrap();
        let generator = GeneratorBuilder::new(config).build().unwrap();
        assert!(matches!(generator.sink(), Sink::Console(_)));
    }

    #[test]
    fn test_builder_shares_token_and_metrics() {
        let config = ConfigFile::from_yaml_str(CONFIG).unwrap();
        let token = ShutdownToken::new();
        let metrics = Arc::new(MetricsCollector::new());

        let generator = GeneratorBuilder::new(config)
            .shutdown(token.clone())
            .metrics(metrics.clone())
            .build()
            .unwrap();

        token.trigger();
        assert!(generator.shutdown_token().is_triggered());
        metrics.update(3, 30);
        assert_eq!(generator.metrics().get_stats().total_logs, 3);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let mut config = ConfigFile::from_yaml_str(CONFIG).unwrap();
        config.settings.rate_normal_min = 5.0;
        assert!(GeneratorBuilder::new(config).build().unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_config_opens_no_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("never.log");
        let mut config = ConfigFile::from_yaml_str(CONFIG).unwrap();
        config.settings.write_to_file = true;
        config.settings.log_file_path = path.clone();
        config.settings.base_exit_probability = 2.0;

        assert!(GeneratorBuilder::new(config).build().unwrap_err().is_config());
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_run_limit_completes_immediately() {
        let config = ConfigFile::from_yaml_str(CONFIG).unwrap();
        let formatter = Formatter::from_config(&config, None);
        let sink = ConsoleSink::with_writer(Vec::new());
        let mut generator = GeneratorBuilder::new(config)
            .build_with(formatter, sink)
            .unwrap();

        let summary = generator.run().unwrap();
        assert_eq!(summary.outcome, RunOutcome::Completed);
        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.metrics.total_logs, 0);
    }
}
