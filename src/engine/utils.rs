//! # Utility Functions (utils.rs)
//!
//! Small helpers shared by the engine: unit conversion, fractional-second
//! sleeps and number formatting for reports.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::time::Duration;

/// Bytes in one megabyte. All rates in logspout are binary megabytes.
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Converts a byte count to megabytes.
#[inline]
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Sleeps for a fractional number of seconds.
///
/// Zero, negative and non-finite values return immediately.
#[inline]
pub fn sleep_secs(seconds: f64) {
    if seconds.is_finite() && seconds > 0.0 {
        std::thread::sleep(Duration::from_secs_f64(seconds));
    }
}

/// Random source for one consumer of a run seed.
///
/// Each consumer uses its own `stream` so that a seeded run is reproducible
/// without components sharing one generator. Without a seed, every call
/// draws fresh OS entropy.
pub fn seeded_rng(seed: Option<u64>, stream: u64) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s.wrapping_add(stream)),
        None => SmallRng::from_os_rng(),
    }
}

/// Formats an integer with `,` thousands separators (`1234567` → `1,234,567`).
pub fn with_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
