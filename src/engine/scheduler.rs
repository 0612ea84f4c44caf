//! # Traffic Scheduler
//!
//! Turns a traffic phase into a sequence of rate segments and hands each one
//! to a [`SegmentWriter`].
//!
//! ```text
//!     random_segments(total, max_seg, min, max, base_exit)
//!       │
//!       ├─ exit check ──pass──► ExitedEarly
//!       │
//!       ├─ slice ~ U(1, min(max_seg, remaining))
//!       │     └─ random_rate(slice, min, max)
//!       │           ├─ maybe perturb max once
//!       │           └─ repeat: seg ~ U(1, remaining), rate ~ U(min, max)
//!       │                      writer.write_segment(rate, seg)
//!       │
//!       └─ remaining ≤ 0 ──► Exhausted
//! ```
//!
//! Shutdown is observed only between segments. A failed write is returned
//! as `Err` immediately.

use super::runner::ShutdownToken;
use super::utils::seeded_rng;
use crate::error::Result;
use rand::rngs::SmallRng;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

/// Something that can produce traffic at a given rate for a given time.
pub trait SegmentWriter {
    /// Writes at `rate_mbs` MB/s for `duration`.
    fn write_segment(&mut self, rate_mbs: f64, duration: Duration) -> Result<()>;
}

impl<W: SegmentWriter + ?Sized> SegmentWriter for &mut W {
    fn write_segment(&mut self, rate_mbs: f64, duration: Duration) -> Result<()> {
        (**self).write_segment(rate_mbs, duration)
    }
}

/// How a successful segment sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// All of the requested time was used.
    Exhausted,
    /// The random exit check ended the sequence before its time was up.
    ExitedEarly,
    /// Shutdown was requested at a segment boundary.
    Interrupted,
}

/// Random perturbation of the upper rate bound in [`Scheduler::random_rate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateChange {
    /// Chance that the upper bound is perturbed for one invocation.
    pub probability: f64,
    /// Largest relative change, e.g. `0.3` for ±30%.
    pub max_fraction: f64,
}

impl Default for RateChange {
    fn default() -> Self {
        Self {
            probability: 0.2,
            max_fraction: 0.3,
        }
    }
}

/// Randomized segment planner. Deterministic for a given seed.
#[derive(Debug)]
pub struct Scheduler {
    rng: SmallRng,
    rate_change: RateChange,
    shutdown: ShutdownToken,
}

impl Scheduler {
    /// Creates a scheduler seeded with `seed`, or from OS entropy when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seeded_rng(seed, 0),
            rate_change: RateChange::default(),
            shutdown: ShutdownToken::new(),
        }
    }

    /// Sets the rate perturbation used by [`Scheduler::random_rate`].
    pub fn with_rate_change(mut self, rate_change: RateChange) -> Self {
        self.rate_change = rate_change;
        self
    }

    /// Observes `token` between segments.
    pub fn with_shutdown(mut self, token: ShutdownToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Fills `duration` seconds with segments at random rates in `[rate_min, rate_max]`.
    ///
    /// With probability `rate_change.probability` the upper bound is scaled by
    /// `1 + U(-max_fraction, max_fraction)` once, before the first segment.
    pub fn random_rate<W: SegmentWriter>(
        &mut self,
        writer: &mut W,
        duration: f64,
        rate_min: f64,
        mut rate_max: f64,
    ) -> Result<SegmentOutcome> {
        if self.rng.random::<f64>() < self.rate_change.probability {
            let fraction = self.rate_change.max_fraction;
            let change = self.uniform(-fraction, fraction);
            rate_max *= 1.0 + change;
            info!(
                "Changing rate_max by {:.2}%, new rate_max: {:.4} MB/s",
                change * 100.0,
                rate_max
            );
        }

        let mut remaining = duration;
        while remaining > 0.0 {
            if self.shutdown.is_triggered() {
                return Ok(SegmentOutcome::Interrupted);
            }

            let segment = self.draw_duration(1.0, remaining, remaining);
            let rate = self.uniform(rate_min, rate_max);
            info!("Selected random rate: {:.4} MB/s", rate);

            writer.write_segment(rate, to_duration(segment))?;
            remaining -= segment;
        }

        Ok(SegmentOutcome::Exhausted)
    }

    /// Splits `total_duration` seconds into [`Scheduler::random_rate`] slices
    /// of at most `max_segment_duration` seconds, with a random early exit
    /// before each slice.
    ///
    /// The exit chance for one check is `base_exit_probability × U(0.5, 1.5)`;
    /// a base of `1.0` or more always exits and `0.0` never does.
    pub fn random_segments<W: SegmentWriter>(
        &mut self,
        writer: &mut W,
        total_duration: f64,
        max_segment_duration: f64,
        rate_min: f64,
        rate_max: f64,
        base_exit_probability: f64,
    ) -> Result<SegmentOutcome> {
        let mut remaining = total_duration;
        while remaining > 0.0 {
            if self.shutdown.is_triggered() {
                return Ok(SegmentOutcome::Interrupted);
            }

            let exit_probability = base_exit_probability * self.uniform(0.5, 1.5);
            let roll = self.rng.random::<f64>();
            if base_exit_probability >= 1.0 || roll < exit_probability {
                info!("Exiting early based on random exit clause.");
                return Ok(SegmentOutcome::ExitedEarly);
            }

            let slice = self.draw_duration(1.0, max_segment_duration.min(remaining), remaining);
            debug!("Starting segment of {:.2} seconds", slice);

            match self.random_rate(writer, slice, rate_min, rate_max)? {
                SegmentOutcome::Interrupted => return Ok(SegmentOutcome::Interrupted),
                SegmentOutcome::Exhausted | SegmentOutcome::ExitedEarly => {}
            }
            remaining -= slice;
        }

        Ok(SegmentOutcome::Exhausted)
    }

    /// `a + (b - a) × U[0, 1)`, also valid when `b < a`.
    #[inline]
    fn uniform(&mut self, a: f64, b: f64) -> f64 {
        a + (b - a) * self.rng.random::<f64>()
    }

    /// Draws `U(a, b)` and caps it at `remaining`. Never returns zero or less
    /// while `remaining` is positive.
    fn draw_duration(&mut self, a: f64, b: f64, remaining: f64) -> f64 {
        let drawn = self.uniform(a, b).min(remaining);
        if drawn > 0.0 {
            drawn
        } else {
            remaining
        }
    }
}

fn to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}
