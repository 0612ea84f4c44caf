use super::OutputSink;
use crate::error::Result;
use std::io::{self, Write};
use tracing::info;

/// Writes lines to standard output, or to any other [`Write`] target.
#[derive(Debug)]
pub struct ConsoleSink<W = io::Stdout> {
    out: W,
}

impl ConsoleSink {
    /// A sink on the process's standard output.
    pub fn new() -> Self {
        info!("Initialized console output handler");
        Self { out: io::stdout() }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ConsoleSink<W> {
    /// A sink on an arbitrary writer.
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write> OutputSink for ConsoleSink<W> {
    fn write(&mut self, lines: &[String]) -> Result<()> {
        let mut buf = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            buf.push_str(line);
            buf.push('\n');
        }
        self.out.write_all(buf.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
