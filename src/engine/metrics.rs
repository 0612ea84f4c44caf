//! Throughput accounting for a generator run.
//!
//! A single [`MetricsCollector`] is created per run and shared by every
//! segment through an `Arc`. Each completed rate segment reports once, and
//! each report appends one throughput sample.
//!
//! ```text
//!     segment 1 ──► update(logs, bytes) ──┐
//!     segment 2 ──► update(logs, bytes) ──┼──► totals + samples[]
//!     segment N ──► update(logs, bytes) ──┘          │
//!                                                     ▼
//!                                   get_stats() ──► MetricsSnapshot
//!                                                  (avg / max / min)
//! ```
//!
//! The average is a plain mean over the per-segment samples, not a
//! time-weighted one, so short early segments weigh as much as long ones.

use super::utils::{bytes_to_mb, with_thousands};
use parking_lot::Mutex;
use std::fmt;
use std::time::{Duration, Instant};

/// Thread-safe collector of run totals and per-segment throughput samples.
///
/// # Example
///
/// ```rust
/// use logspout::MetricsCollector;
///
/// let metrics = MetricsCollector::new();
/// metrics.update(10, 100);
/// metrics.update(5, 50);
///
/// let stats = metrics.get_stats();
/// assert_eq!(stats.total_logs, 15);
/// assert_eq!(stats.total_bytes, 150);
/// ```
#[derive(Debug)]
pub struct MetricsCollector {
    start: Instant,
    inner: Mutex<Totals>,
}

#[derive(Debug, Default)]
struct Totals {
    total_logs: u64,
    total_bytes: u64,
    /// MB/s samples, one per update with a non-zero elapsed time.
    samples: Vec<f64>,
}

/// Point-in-time view of a [`MetricsCollector`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Lines generated and written so far.
    pub total_logs: u64,

    /// Bytes written so far, newlines included.
    pub total_bytes: u64,

    /// Time since the collector was created.
    pub duration: Duration,

    /// Mean of the throughput samples in MB/s, 0 when there are none.
    pub avg_rate_mb_s: f64,

    /// Largest throughput sample in MB/s, 0 when there are none.
    pub max_rate_mb_s: f64,

    /// Smallest throughput sample in MB/s, 0 when there are none.
    pub min_rate_mb_s: f64,

    /// Number of samples the averages were computed from.
    pub samples: usize,
}

impl MetricsCollector {
    /// Creates an empty collector. The run clock starts now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            inner: Mutex::new(Totals::default()),
        }
    }

    /// Adds one segment's output to the totals and records a throughput sample.
    ///
    /// The sample is `bytes / elapsed_since_start` in MB/s.
    pub fn update(&self, logs: u64, bytes: u64) {
        let mut totals = self.inner.lock();
        totals.total_logs += logs;
        totals.total_bytes += bytes;

        let elapsed = self.start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            totals.samples.push(bytes_to_mb(bytes) / elapsed);
        }
    }

    /// Reads the totals and derives the rate statistics atomically.
    pub fn get_stats(&self) -> MetricsSnapshot {
        let totals = self.inner.lock();
        let duration = self.start.elapsed();

        let (avg, max, min) = if totals.samples.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = totals.samples.iter().sum();
            let max = totals.samples.iter().copied().fold(f64::MIN, f64::max);
            let min = totals.samples.iter().copied().fold(f64::MAX, f64::min);
            (sum / totals.samples.len() as f64, max, min)
        };

        MetricsSnapshot {
            total_logs: totals.total_logs,
            total_bytes: totals.total_bytes,
            duration,
            avg_rate_mb_s: avg,
            max_rate_mb_s: max,
            min_rate_mb_s: min,
            samples: totals.samples.len(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSnapshot {
    /// Total output in megabytes.
    #[inline]
    pub fn total_mb(&self) -> f64 {
        bytes_to_mb(self.total_bytes)
    }

    /// Overall throughput in MB/s over the whole run so far.
    pub fn overall_rate_mb_s(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_mb() / secs
        } else {
            0.0
        }
    }

    /// Returns a multi-line report for end-of-run output.
    pub fn summary(&self) -> String {
        format!(
            "Generator Metrics:\n\
             ├─ Output:\n\
             │  ├─ Total Logs: {}\n\
             │  ├─ Total Data: {:.3} MB\n\
             │  └─ Duration: {:.3} seconds\n\
             └─ Throughput:\n\
             \x20  ├─ Average Rate: {:.3} MB/s\n\
             \x20  ├─ Maximum Rate: {:.3} MB/s\n\
             \x20  ├─ Minimum Rate: {:.3} MB/s\n\
             \x20  └─ Overall Rate: {:.3} MB/s",
            with_thousands(self.total_logs),
            self.total_mb(),
            self.duration.as_secs_f64(),
            self.avg_rate_mb_s,
            self.max_rate_mb_s,
            self.min_rate_mb_s,
            self.overall_rate_mb_s(),
        )
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total Logs: {}, Total Data: {:.3} MB, Duration: {:.3} seconds, \
             Average Rate: {:.3} MB/s, Maximum Rate: {:.3} MB/s, Minimum Rate: {:.3} MB/s",
            with_thousands(self.total_logs),
            self.total_mb(),
            self.duration.as_secs_f64(),
            self.avg_rate_mb_s,
            self.max_rate_mb_s,
            self.min_rate_mb_s,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn snapshot(total_logs: u64, total_bytes: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            total_logs,
            total_bytes,
            duration: Duration::from_secs(1),
            avg_rate_mb_s: 0.5,
            max_rate_mb_s: 0.75,
            min_rate_mb_s: 0.25,
            samples: 2,
        }
    }

    #[test]
    fn test_update_accumulates() {
        let metrics = MetricsCollector::new();
        metrics.update(10, 100);
        metrics.update(5, 50);

        let stats = metrics.get_stats();
        assert_eq!(stats.total_logs, 15);
        assert_eq!(stats.total_bytes, 150);
    }

    #[test]
    fn test_empty_collector_reports_zero_rates() {
        let stats = MetricsCollector::new().get_stats();
        assert_eq!(stats.total_logs, 0);
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.avg_rate_mb_s, 0.0);
        assert_eq!(stats.max_rate_mb_s, 0.0);
        assert_eq!(stats.min_rate_mb_s, 0.0);
    }

    #[test]
    fn test_rate_statistics_ordering() {
        let metrics = MetricsCollector::new();
        thread::sleep(Duration::from_millis(5));
        metrics.update(100, 1_048_576);
        metrics.update(1, 10);
        metrics.update(50, 500_000);

        let stats = metrics.get_stats();
        assert_eq!(stats.samples, 3);
        assert!(stats.min_rate_mb_s <= stats.avg_rate_mb_s);
        assert!(stats.avg_rate_mb_s <= stats.max_rate_mb_s);
        assert!(stats.max_rate_mb_s > 0.0);
    }

    #[test]
    fn test_duration_grows() {
        let metrics = MetricsCollector::new();
        let first = metrics.get_stats().duration;
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.get_stats().duration > first);
    }

    #[test]
    fn test_concurrent_updates() {
        let metrics = Arc::new(MetricsCollector::new());
        let mut handles = vec![];

        for _ in 0..4 {
            let metrics = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    metrics.update(1, 101);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = metrics.get_stats();
        assert_eq!(stats.total_logs, 4000);
        assert_eq!(stats.total_bytes, 404_000);
    }

    #[test]
    fn test_display_format() {
        let text = snapshot(1234, 1_048_576).to_string();
        assert_eq!(
            text,
            "Total Logs: 1,234, Total Data: 1.000 MB, Duration: 1.000 seconds, \
             Average Rate: 0.500 MB/s, Maximum Rate: 0.750 MB/s, Minimum Rate: 0.250 MB/s"
        );
    }

    #[test]
    fn test_summary_contents() {
        let summary = snapshot(2_000_000, 2 * 1_048_576).summary();
        assert!(summary.contains("Total Logs: 2,000,000"));
        assert!(summary.contains("Total Data: 2.000 MB"));
        assert!(summary.contains("Overall Rate: 2.000 MB/s"));
    }
}
