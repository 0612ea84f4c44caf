//! # Line Formatting
//!
//! Builds individual log lines. The engine only sees [`LineGenerator`],
//! which picks a timestamp, level and message and hands them to a
//! [`LogFormatter`].
//!
//! ```text
//!     LineGenerator::next_line()
//!          │
//!          ├─ timestamp  (UTC, RFC 3339, microseconds)
//!          ├─ level      (random from log_levels)
//!          ├─ message    (random from MESSAGES)
//!          ▼
//!     LogFormatter::format_log ──► Http   "{ts} {level} {ip} - \"{ua}\" HTTP/1.1 {status} {msg}"
//!                              └─► Custom "$timestamp $log_level $message"
//! ```

mod agents;
mod custom;
mod http;

pub use agents::{random_ipv4, UserAgentPool, FALLBACK_USER_AGENT};
pub use custom::{CustomFormatter, Template, TemplateError};
pub use http::{HttpFormatter, DEFAULT_STATUS};

use crate::config::ConfigFile;
use crate::engine::seeded_rng;
use chrono::{SecondsFormat, Utc};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

/// Messages lines are drawn from.
pub const MESSAGES: [&str; 10] = [
    "User login successful",
    "Database query executed",
    "API request received",
    "File upload completed",
    "Cache updated",
    "Configuration loaded",
    "Session expired",
    "Data validation passed",
    "Background task started",
    "Email notification sent",
];

/// Levels used when the configuration does not list any.
pub const DEFAULT_LOG_LEVELS: [&str; 4] = ["DEBUG", "INFO", "WARNING", "ERROR"];

/// Turns the parts of a log entry into one line of text.
pub trait LogFormatter {
    /// Formats one entry. Must not include a trailing newline.
    fn format_log(&mut self, timestamp: &str, level: &str, message: &str) -> String;
}

/// The formatter selected by configuration.
#[derive(Debug, Clone)]
pub enum Formatter {
    /// HTTP access-log layout.
    Http(HttpFormatter),
    /// User template layout.
    Custom(CustomFormatter),
}

impl Formatter {
    /// Picks and builds the formatter described by `config`.
    ///
    /// Random choices inside the formatter derive from `seed` when given.
    pub fn from_config(config: &ConfigFile, seed: Option<u64>) -> Self {
        let settings = &config.settings;
        let mut rng = seeded_rng(seed, 2);

        if settings.http_format_logs {
            let agents = UserAgentPool::new(
                config.user_agent_browsers(),
                config.user_agent_systems(),
                settings.user_agent_pool_size,
                &mut rng,
            );
            Formatter::Http(HttpFormatter::new(config.status_codes(), agents, rng))
        } else {
            Formatter::Custom(CustomFormatter::new(
                &settings.custom_log_format,
                settings.custom_app_names.clone(),
                rng,
            ))
        }
    }
}

impl LogFormatter for Formatter {
    #[inline]
    fn format_log(&mut self, timestamp: &str, level: &str, message: &str) -> String {
        match self {
            Formatter::Http(f) => f.format_log(timestamp, level, message),
            Formatter::Custom(f) => f.format_log(timestamp, level, message),
        }
    }
}

impl<T: LogFormatter + ?Sized> LogFormatter for Box<T> {
    fn format_log(&mut self, timestamp: &str, level: &str, message: &str) -> String {
        (**self).format_log(timestamp, level, message)
    }
}

/// Source of complete log lines.
#[derive(Debug, Clone)]
pub struct LineGenerator<F> {
    formatter: F,
    levels: Vec<String>,
    rng: SmallRng,
}

impl<F: LogFormatter> LineGenerator<F> {
    /// Creates a generator. An empty `levels` list falls back to
    /// [`DEFAULT_LOG_LEVELS`].
    pub fn new(formatter: F, levels: Vec<String>, rng: SmallRng) -> Self {
        let levels = if levels.is_empty() {
            DEFAULT_LOG_LEVELS.iter().map(|l| l.to_string()).collect()
        } else {
            levels
        };
        Self {
            formatter,
            levels,
            rng,
        }
    }

    /// Produces one line, without its newline.
    pub fn next_line(&mut self) -> String {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        let level = self
            .levels
            .choose(&mut self.rng)
            .map(String::as_str)
            .unwrap_or("INFO");
        let message = MESSAGES.choose(&mut self.rng).copied().unwrap_or(MESSAGES[0]);
        self.formatter.format_log(&timestamp, level, message)
    }

    /// The formatter lines go through.
    pub fn formatter(&self) -> &F {
        &self.formatter
    }

    /// Levels lines are drawn from.
    pub fn levels(&self) -> &[String] {
        &self.levels
    }
}
