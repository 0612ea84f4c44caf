//! # Engine Module
//!
//! Rate control and scheduling. Everything here is independent of how lines
//! look and where they go; formatting and output come in through the
//! [`LogFormatter`](crate::LogFormatter) and [`OutputSink`](crate::OutputSink)
//! traits.
//!
//! ## Module Structure
//!
//! ```text
//!     engine/
//!     ├── mod.rs          (Module organization)
//!     ├── bucket.rs       (Token bucket gate)
//!     ├── metrics.rs      (Run totals and throughput samples)
//!     ├── batch.rs        (Adaptive batch controller)
//!     ├── scheduler.rs    (Random rate and random segment strategies)
//!     ├── runner.rs       (Normal/peak run loop and shutdown token)
//!     └── utils.rs        (Unit conversion and sleeps)
//! ```
//!
//! ## Architecture Flow
//!
//! ```text
//!     ┌───────────┐
//!     │ Generator │ ◄── normal / peak phases
//!     └─────┬─────┘
//!           │
//!           ▼
//!     ┌───────────┐
//!     │ Scheduler │ ◄── random segments and rates
//!     └─────┬─────┘
//!           │
//!           ▼
//!     ┌───────────┐      ┌──────────────┐
//!     │   Batch   │ ───► │ Token bucket │
//!     └─────┬─────┘      └──────────────┘
//!           │
//!           ▼
//!     ┌───────────┐
//!     │  Metrics  │ ◄── one update per segment
//!     └───────────┘
//! ```

mod batch;
mod bucket;
mod metrics;
mod runner;
mod scheduler;
mod utils;

/// Adaptive batch controller and the scheduler-facing writer built on it
pub use batch::{
    BatchController, BatchReport, BatchWriter, DEFAULT_LINE_SIZE, GROWTH_WHEN_BEHIND,
    GROWTH_WHEN_IDLE, IDLE_RATE_SLEEP_SECS, IDLE_THRESHOLD_SECS, INITIAL_BATCH_SIZE,
    RETRY_SLEEP_SECS,
};

/// Token bucket rate limiter
pub use bucket::{BucketStats, TokenBucket};

/// Run metrics
pub use metrics::{MetricsCollector, MetricsSnapshot};

/// Run loop and cancellation
pub use runner::{Generator, RunOutcome, RunSummary, ShutdownToken};

/// Segment strategies
pub use scheduler::{RateChange, Scheduler, SegmentOutcome, SegmentWriter};

/// Helpers
pub use utils::{bytes_to_mb, seeded_rng, sleep_secs, with_thousands, BYTES_PER_MB};
