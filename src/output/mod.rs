//! # Output Sinks
//!
//! Where generated lines end up. A sink receives whole batches and either
//! persists all of them or reports an error; the engine aborts the run on
//! the first error.

mod console;
mod file;

pub use console::ConsoleSink;
pub use file::{rotated_path, FileSink};

use crate::config::GeneratorConfig;
use crate::error::Result;

/// Destination for batches of log lines.
pub trait OutputSink {
    /// Writes every line in `lines`, each followed by a newline.
    fn write(&mut self, lines: &[String]) -> Result<()>;

    /// Flushes and releases the destination. Later writes fail.
    fn close(&mut self) -> Result<()>;
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    fn write(&mut self, lines: &[String]) -> Result<()> {
        (**self).write(lines)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// The sink selected by configuration.
#[derive(Debug)]
pub enum Sink {
    /// Standard output.
    Console(ConsoleSink),
    /// A file, optionally rotated by size.
    File(FileSink),
}

impl Sink {
    /// Opens the sink described by `config`.
    ///
    /// Fails if the log file cannot be created.
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        if config.write_to_file {
            let rotation = config
                .log_rotation_enabled
                .then_some(config.log_rotation_size);
            Ok(Sink::File(FileSink::open(&config.log_file_path, rotation)?))
        } else {
            Ok(Sink::Console(ConsoleSink::new()))
        }
    }
}

impl OutputSink for Sink {
    #[inline]
    fn write(&mut self, lines: &[String]) -> Result<()> {
        match self {
            Sink::Console(s) => s.write(lines),
            Sink::File(s) => s.write(lines),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Sink::Console(s) => s.close(),
            Sink::File(s) => s.close(),
        }
    }
}
