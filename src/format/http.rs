//! HTTP access-log style lines.

use super::agents::{random_ipv4, UserAgentPool};
use super::LogFormatter;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;

/// Status used when no status codes are configured.
pub const DEFAULT_STATUS: &str = "200";

/// Formats `{ts} {level} {ip} - "{agent}" HTTP/1.1 {status} {message}`.
#[derive(Debug, Clone)]
pub struct HttpFormatter {
    status_codes: Vec<String>,
    agents: UserAgentPool,
    rng: SmallRng,
}

impl HttpFormatter {
    /// Creates a formatter drawing statuses from `status_codes`.
    pub fn new(status_codes: Vec<String>, agents: UserAgentPool, rng: SmallRng) -> Self {
        Self {
            status_codes,
            agents,
            rng,
        }
    }
}

impl LogFormatter for HttpFormatter {
    fn format_log(&mut self, timestamp: &str, level: &str, message: &str) -> String {
        let ip = random_ipv4(&mut self.rng);
        let agent = self.agents.pick(&mut self.rng);
        let status = self
            .status_codes
            .choose(&mut self.rng)
            .map(String::as_str)
            .unwrap_or(DEFAULT_STATUS);

        format!(
            "{} {} {} - \"{}\" HTTP/1.1 {} {}",
            timestamp, level, ip, agent, status, message
        )
    }
}
