//! Error types shared by the generator, its configuration layer and its sinks.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by logspout.
///
/// Formatting problems never show up here: a bad custom template is
/// recovered inside the formatter by falling back to the default line
/// layout.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration. Raised before any generation starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration file is not valid YAML or does not match the schema.
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O failure, typically from an output sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output sink refused the write for a reason other than I/O.
    #[error("output error: {0}")]
    Output(String),
}

impl Error {
    /// Shorthand for building [`Error::Config`].
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Returns true for errors raised by configuration loading or validation.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Yaml(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::config("rate_normal_min must be <= rate_normal_max");
        assert_eq!(
            err.to_string(),
            "configuration error: rate_normal_min must be <= rate_normal_max"
        );

        let err = Error::Output("file handle is not open".into());
        assert_eq!(err.to_string(), "output error: file handle is not open");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_config());
    }

    #[test]
    fn test_is_config() {
        assert!(Error::config("bad").is_config());
        let yaml = serde_yaml::from_str::<u32>("not a number").unwrap_err();
        assert!(Error::from(yaml).is_config());
    }
}
