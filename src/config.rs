//! # Configuration
//!
//! YAML configuration with a mandatory `CONFIG` block and a few optional
//! root-level lists.
//!
//! ```text
//!     config.yaml ──► serde_yaml::Value
//!                        │
//!                        ├─ CONFIG present?            (else Error::Config)
//!                        ├─ LOG_GEN_<KEY> overrides    (typed like the file value)
//!                        ├─ required keys present?     (else Error::Config)
//!                        ▼
//!                    ConfigFile ──► validate() ──► ready
//! ```
//!
//! ## Example
//!
//! ```rust
//! use logspout::ConfigFile;
//!
//! let yaml = r#"
//! CONFIG:
//!   duration_normal: 10
//!   duration_peak: 5
//!   rate_normal_min: 0.0001
//!   rate_normal_max: 0.001
//!   rate_peak: 0.002
//!   log_line_size_estimate: 100
//!   user_agent_pool_size: 10
//!   max_segment_duration_normal: 5
//!   base_exit_probability: 0.1
//!   rate_change_probability: 0.2
//!   rate_change_max_percentage: 0.3
//!   write_to_file: false
//!   log_file_path: logs/app.log
//!   log_rotation_enabled: false
//!   log_rotation_size: 10
//!   http_format_logs: true
//!   stop_after_seconds: 30
//!   custom_app_names: []
//!   custom_log_format: "$timestamp $log_level $message"
//!   logging_level: INFO
//! "#;
//!
//! let config = ConfigFile::from_yaml_str(yaml).unwrap();
//! assert_eq!(config.settings.duration_normal, 10.0);
//! assert_eq!(config.levels().len(), 4);
//! ```

use crate::engine::RateChange;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Prefix of environment variables that override `CONFIG` keys.
pub const ENV_PREFIX: &str = "LOG_GEN_";

/// `stop_after_seconds` value meaning "run until interrupted".
pub const RUN_FOREVER: f64 = -1.0;

/// Keys every `CONFIG` block must contain.
pub const REQUIRED_KEYS: [&str; 20] = [
    "duration_normal",
    "duration_peak",
    "rate_normal_min",
    "rate_normal_max",
    "rate_peak",
    "log_line_size_estimate",
    "user_agent_pool_size",
    "max_segment_duration_normal",
    "base_exit_probability",
    "rate_change_probability",
    "rate_change_max_percentage",
    "write_to_file",
    "log_file_path",
    "log_rotation_enabled",
    "log_rotation_size",
    "http_format_logs",
    "stop_after_seconds",
    "custom_app_names",
    "custom_log_format",
    "logging_level",
];

/// Accepted `logging_level` values, compared case-insensitively.
pub const LOGGING_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// The whole configuration file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigFile {
    /// The `CONFIG` block.
    #[serde(rename = "CONFIG")]
    pub settings: GeneratorConfig,

    /// Levels lines are drawn from.
    #[serde(default)]
    pub log_levels: Option<Vec<String>>,

    /// HTTP status codes mapped to sample messages. Only the codes are used.
    #[serde(default)]
    pub http_status_codes: Option<Mapping>,

    /// Browser names for generated user agents.
    #[serde(default)]
    pub user_agent_browsers: Option<Vec<String>>,

    /// Operating system strings for generated user agents.
    #[serde(default)]
    pub user_agent_systems: Option<Vec<String>>,
}

/// Settings of the `CONFIG` block.
///
/// Durations are in seconds and rates in MB/s.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Length of the normal phase.
    pub duration_normal: f64,
    /// Length of the peak phase.
    pub duration_peak: f64,
    /// Lower rate bound during normal traffic.
    pub rate_normal_min: f64,
    /// Upper rate bound during normal traffic, and lower bound during peaks.
    pub rate_normal_max: f64,
    /// Upper rate bound during peaks.
    pub rate_peak: f64,
    /// Expected bytes per line, used to convert rates into lines per second.
    pub log_line_size_estimate: f64,
    /// Number of pre-generated user agents.
    pub user_agent_pool_size: usize,
    /// Longest slice of the normal phase.
    pub max_segment_duration_normal: f64,
    /// Base chance of ending the normal phase before each slice.
    pub base_exit_probability: f64,
    /// Chance of perturbing the upper rate bound per rate sequence.
    pub rate_change_probability: f64,
    /// Largest relative perturbation, e.g. `0.3` for ±30%.
    pub rate_change_max_percentage: f64,
    /// Write to `log_file_path` instead of stdout.
    pub write_to_file: bool,
    /// Output file location.
    pub log_file_path: PathBuf,
    /// Rotate the output file by size.
    pub log_rotation_enabled: bool,
    /// Rotation threshold in MB.
    pub log_rotation_size: f64,
    /// HTTP layout instead of the custom template.
    pub http_format_logs: bool,
    /// Total run time, `-1` to run until interrupted.
    pub stop_after_seconds: f64,
    /// App names prefixed to custom-format messages.
    pub custom_app_names: Vec<String>,
    /// Template for custom-format lines.
    pub custom_log_format: String,
    /// Diagnostic log level of the generator itself.
    pub logging_level: String,
    /// Seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ConfigFile {
    /// Reads, overrides from the process environment and validates `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "cannot read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::parse(&text, std::env::vars())?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Parses and validates YAML text without environment overrides.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, std::iter::empty())
    }

    /// Parses YAML text, applies overrides from `env` and validates.
    pub fn parse<I>(text: &str, env: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut root: Value = serde_yaml::from_str(text)?;
        let block = root
            .as_mapping_mut()
            .and_then(|m| m.get_mut("CONFIG"))
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| Error::config("Missing 'CONFIG' block in configuration."))?;

        apply_env_overrides(block, env);

        for key in REQUIRED_KEYS {
            if !block.contains_key(key) {
                return Err(Error::config(format!(
                    "Missing required configuration parameter in 'CONFIG' block: {}",
                    key
                )));
            }
        }

        let config: ConfigFile = serde_yaml::from_value(root)?;
        config.validate()?;
        info!("Configuration validation successful");
        Ok(config)
    }

    /// Checks ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        self.settings.validate()?;

        if let Some(levels) = &self.log_levels {
            if levels.is_empty() {
                return Err(Error::config(
                    "Configuration parameter 'log_levels' must not be empty if provided.",
                ));
            }
        }

        Ok(())
    }

    /// Levels to draw from, defaulting to DEBUG/INFO/WARNING/ERROR.
    pub fn levels(&self) -> Vec<String> {
        match &self.log_levels {
            Some(levels) if !levels.is_empty() => levels.clone(),
            _ => crate::format::DEFAULT_LOG_LEVELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
        }
    }

    /// HTTP status codes as strings, in file order.
    pub fn status_codes(&self) -> Vec<String> {
        self.http_status_codes
            .iter()
            .flat_map(|map| map.keys())
            .filter_map(|key| match key {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect()
    }

    /// Configured browser names, possibly empty.
    pub fn user_agent_browsers(&self) -> &[String] {
        self.user_agent_browsers.as_deref().unwrap_or_default()
    }

    /// Configured system strings, possibly empty.
    pub fn user_agent_systems(&self) -> &[String] {
        self.user_agent_systems.as_deref().unwrap_or_default()
    }
}

impl GeneratorConfig {
    /// Checks every `CONFIG` value against its allowed range.
    pub fn validate(&self) -> Result<()> {
        at_least("duration_normal", self.duration_normal, 0.0)?;
        at_least("duration_peak", self.duration_peak, 0.0)?;
        at_least("rate_normal_min", self.rate_normal_min, 0.0)?;
        at_least("rate_normal_max", self.rate_normal_max, 0.0)?;
        at_least("rate_peak", self.rate_peak, 0.0)?;
        at_least("log_line_size_estimate", self.log_line_size_estimate, 1.0)?;
        at_least(
            "max_segment_duration_normal",
            self.max_segment_duration_normal,
            1.0,
        )?;
        probability("base_exit_probability", self.base_exit_probability)?;
        probability("rate_change_probability", self.rate_change_probability)?;
        at_least(
            "rate_change_max_percentage",
            self.rate_change_max_percentage,
            0.0,
        )?;
        at_least("log_rotation_size", self.log_rotation_size, 0.0)?;

        if self.rate_normal_min > self.rate_normal_max {
            return Err(Error::config(format!(
                "rate_normal_min ({}) must be less than or equal to rate_normal_max ({})",
                self.rate_normal_min, self.rate_normal_max
            )));
        }

        if self.stop_after_seconds != RUN_FOREVER {
            at_least("stop_after_seconds", self.stop_after_seconds, 0.0).map_err(|_| {
                Error::config(format!(
                    "Configuration parameter 'stop_after_seconds' must be -1 or at least 0, got {}",
                    self.stop_after_seconds
                ))
            })?;
        }

        if !LOGGING_LEVELS
            .iter()
            .any(|l| l.eq_ignore_ascii_case(&self.logging_level))
        {
            return Err(Error::config(format!(
                "Invalid logging level '{}'. Must be one of {}",
                self.logging_level,
                LOGGING_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Total run time, or `None` to run until interrupted.
    pub fn run_limit(&self) -> Option<Duration> {
        if self.stop_after_seconds == RUN_FOREVER {
            None
        } else {
            Some(Duration::try_from_secs_f64(self.stop_after_seconds).unwrap_or(Duration::MAX))
        }
    }

    /// Rate perturbation for the scheduler.
    pub fn rate_change(&self) -> RateChange {
        RateChange {
            probability: self.rate_change_probability,
            max_fraction: self.rate_change_max_percentage,
        }
    }

    /// `logging_level` as a `tracing` filter directive.
    pub fn tracing_level(&self) -> &'static str {
        match self.logging_level.to_ascii_uppercase().as_str() {
            "DEBUG" => "debug",
            "WARNING" => "warn",
            "ERROR" | "CRITICAL" => "error",
            _ => "info",
        }
    }
}

fn at_least(key: &str, value: f64, min: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(Error::config(format!(
            "Configuration parameter '{}' must be a finite number, got {}",
            key, value
        )));
    }
    if value < min {
        return Err(Error::config(format!(
            "Configuration parameter '{}' must be at least {}, got {}",
            key, min, value
        )));
    }
    Ok(())
}

fn probability(key: &str, value: f64) -> Result<()> {
    at_least(key, value, 0.0)?;
    if value > 1.0 {
        return Err(Error::config(format!(
            "Configuration parameter '{}' must be at most 1, got {}",
            key, value
        )));
    }
    Ok(())
}

/// Replaces `CONFIG` values with `LOG_GEN_<KEY>` variables from `env`.
///
/// Only keys already present are overridden, and each value is converted
/// to the type found in the file:
///
/// - booleans: `true`, `yes`, `1` or `y` (any case) mean true, anything else false
/// - lists: comma-separated, items trimmed
/// - integers and floats: parsed, unparsable values are kept as before
/// - strings: taken verbatim
pub fn apply_env_overrides<I>(block: &mut Mapping, env: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let env: Vec<(String, String)> = env
        .into_iter()
        .filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .collect();
    if env.is_empty() {
        return;
    }

    for (key, current) in block.iter_mut() {
        let Some(name) = key.as_str() else { continue };
        let env_key = format!("{}{}", ENV_PREFIX, name.to_ascii_uppercase());
        let Some((_, raw)) = env.iter().find(|(k, _)| *k == env_key) else {
            continue;
        };

        match convert_like(current, raw) {
            Some(value) => {
                *current = value;
                info!("Configuration '{}' overridden from environment variable", name);
            }
            None => warn!(
                "Could not convert environment variable {} to {}",
                env_key,
                type_name(current)
            ),
        }
    }
}

fn convert_like(current: &Value, raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    match current {
        Value::Bool(_) => Some(Value::Bool(matches!(
            trimmed.to_ascii_lowercase().as_str(),
            "true" | "yes" | "1" | "y"
        ))),
        Value::Sequence(_) => Some(Value::Sequence(
            raw.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        )),
        Value::Number(n) if n.is_f64() => trimmed.parse::<f64>().ok().map(Value::from),
        Value::Number(_) => trimmed.parse::<i64>().ok().map(Value::from),
        Value::String(_) => Some(Value::String(raw.to_string())),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dict",
        Value::Tagged(_) => "tagged",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
CONFIG:
  duration_normal: 20
  duration_peak: 10
  rate_normal_min: 0.0001
  rate_normal_max: 0.5
  rate_peak: 1.0
  log_line_size_estimate: 120
  user_agent_pool_size: 50
  max_segment_duration_normal: 5
  base_exit_probability: 0.05
  rate_change_probability: 0.1
  rate_change_max_percentage: 0.25
  write_to_file: false
  log_file_path: logs/generated.log
  log_rotation_enabled: true
  log_rotation_size: 50
  http_format_logs: true
  stop_after_seconds: -1
  custom_app_names: ["web", "worker"]
  custom_log_format: "${timestamp} ${log_level} ${message}"
  logging_level: info
log_levels: [INFO, ERROR]
http_status_codes:
  200: ["OK"]
  "404": ["Not Found"]
user_agent_browsers: [Chrome, Firefox]
user_agent_systems: ["Windows NT 10.0; Win64; x64"]
"#;

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn replace(key: &str, value: &str) -> String {
        SAMPLE
            .lines()
            .map(|line| {
                if line.trim_start().starts_with(&format!("{}:", key)) {
                    format!("  {}: {}", key, value)
                } else {
                    line.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_sample_parses() {
        let config = ConfigFile::from_yaml_str(SAMPLE).unwrap();
        let s = &config.settings;

        assert_eq!(s.duration_normal, 20.0);
        assert_eq!(s.user_agent_pool_size, 50);
        assert_eq!(s.log_file_path, PathBuf::from("logs/generated.log"));
        assert_eq!(s.custom_app_names, vec!["web", "worker"]);
        assert_eq!(s.seed, None);
        assert_eq!(s.run_limit(), None);
        assert_eq!(config.levels(), vec!["INFO", "ERROR"]);
        assert_eq!(config.status_codes(), vec!["200", "404"]);
        assert_eq!(config.user_agent_browsers().len(), 2);
    }

    #[test]
    fn test_missing_config_block() {
        let err = ConfigFile::from_yaml_str("log_levels: [INFO]\n").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("Missing 'CONFIG' block"));
    }

    #[test]
    fn test_missing_key() {
        let text: String = SAMPLE
            .lines()
            .filter(|l| !l.contains("rate_peak"))
            .collect::<Vec<_>>()
            .join("\n");
        let err = ConfigFile::from_yaml_str(&text).unwrap_err();
        assert!(err.to_string().contains("'CONFIG' block: rate_peak"));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let err = ConfigFile::from_yaml_str(&replace("rate_normal_min", "0.9")).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("rate_normal_min (0.9)"));
    }

    #[test]
    fn test_invalid_logging_level() {
        let err = ConfigFile::from_yaml_str(&replace("logging_level", "VERBOSE")).unwrap_err();
        assert!(err.to_string().contains("Invalid logging level 'VERBOSE'"));
    }

    #[test]
    fn test_range_checks() {
        for (key, value) in [
            ("base_exit_probability", "1.5"),
            ("rate_change_probability", "-0.1"),
            ("log_line_size_estimate", "0"),
            ("max_segment_duration_normal", "0.5"),
            ("duration_peak", "-1"),
            ("stop_after_seconds", "-5"),
            ("log_rotation_size", "-1"),
        ] {
            let result = ConfigFile::from_yaml_str(&replace(key, value));
            assert!(result.is_err(), "{} = {} accepted", key, value);
        }
    }

    #[test]
    fn test_non_finite_numbers_rejected() {
        for key in [
            "duration_normal",
            "duration_peak",
            "max_segment_duration_normal",
            "rate_normal_max",
            "rate_peak",
            "stop_after_seconds",
        ] {
            for value in [".inf", ".nan"] {
                let err = ConfigFile::from_yaml_str(&replace(key, value)).unwrap_err();
                assert!(err.is_config(), "{} = {} accepted", key, value);
            }
        }
    }

    #[test]
    fn test_huge_run_limit_is_unbounded() {
        let config = ConfigFile::from_yaml_str(&replace("stop_after_seconds", "1e300")).unwrap();
        assert_eq!(config.settings.run_limit(), Some(Duration::MAX));
    }

    #[test]
    fn test_wrong_type_is_yaml_error() {
        let err = ConfigFile::from_yaml_str(&replace("write_to_file", "\"maybe\"")).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn test_empty_log_levels_rejected() {
        let text = SAMPLE.replace("log_levels: [INFO, ERROR]", "log_levels: []");
        assert!(ConfigFile::from_yaml_str(&text).is_err());
    }

    #[test]
    fn test_run_limit_and_seed() {
        let text = replace("stop_after_seconds", "2.5\n  seed: 77");
        let config = ConfigFile::from_yaml_str(&text).unwrap();
        assert_eq!(config.settings.run_limit(), Some(Duration::from_millis(2500)));
        assert_eq!(config.settings.seed, Some(77));
    }

    #[test]
    fn test_env_overrides_follow_types() {
        let config = ConfigFile::parse(
            SAMPLE,
            env(&[
                ("LOG_GEN_DURATION_NORMAL", "45"),
                ("LOG_GEN_RATE_PEAK", "2.5"),
                ("LOG_GEN_WRITE_TO_FILE", "Yes"),
                ("LOG_GEN_CUSTOM_APP_NAMES", "api, batch ,cron"),
                ("LOG_GEN_LOG_FILE_PATH", "/tmp/out.log"),
                ("LOG_GEN_LOGGING_LEVEL", "DEBUG"),
                ("UNRELATED", "1"),
            ]),
        )
        .unwrap();
        let s = &config.settings;

        assert_eq!(s.duration_normal, 45.0);
        assert_eq!(s.rate_peak, 2.5);
        assert!(s.write_to_file);
        assert_eq!(s.custom_app_names, vec!["api", "batch", "cron"]);
        assert_eq!(s.log_file_path, PathBuf::from("/tmp/out.log"));
        assert_eq!(s.tracing_level(), "debug");
    }

    #[test]
    fn test_unconvertible_override_keeps_value() {
        let config = ConfigFile::parse(
            SAMPLE,
            env(&[
                ("LOG_GEN_USER_AGENT_POOL_SIZE", "lots"),
                ("LOG_GEN_RATE_NORMAL_MAX", "fast"),
            ]),
        )
        .unwrap();
        assert_eq!(config.settings.user_agent_pool_size, 50);
        assert_eq!(config.settings.rate_normal_max, 0.5);
    }

    #[test]
    fn test_bool_override_false_for_other_text() {
        let mut block = Mapping::new();
        block.insert("http_format_logs".into(), Value::Bool(true));
        apply_env_overrides(&mut block, env(&[("LOG_GEN_HTTP_FORMAT_LOGS", "off")]));
        assert_eq!(block.get("http_format_logs"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_override_ignores_absent_keys() {
        let mut block = Mapping::new();
        block.insert("duration_peak".into(), Value::from(10));
        apply_env_overrides(&mut block, env(&[("LOG_GEN_SEED", "5")]));
        assert_eq!(block.len(), 1);
        assert!(!block.contains_key("seed"));
    }

    #[test]
    fn test_tracing_level_mapping() {
        let mut s = ConfigFile::from_yaml_str(SAMPLE).unwrap().settings;
        for (level, expected) in [
            ("debug", "debug"),
            ("INFO", "info"),
            ("Warning", "warn"),
            ("ERROR", "error"),
            ("critical", "error"),
        ] {
            s.logging_level = level.to_string();
            assert_eq!(s.tracing_level(), expected);
        }
    }

    #[test]
    fn test_rate_change_from_config() {
        let s = ConfigFile::from_yaml_str(SAMPLE).unwrap().settings;
        assert_eq!(
            s.rate_change(),
            RateChange {
                probability: 0.1,
                max_fraction: 0.25
            }
        );
    }
}
