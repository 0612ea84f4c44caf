//! File output with optional size-based rotation.
//!
//! ```text
//!     write(batch)
//!       │
//!       ├─ rotation on and size ≥ limit?
//!       │     └─ rename app.log → app_20240501103000.log, open fresh app.log
//!       │
//!       └─ append batch, flush
//! ```

use super::OutputSink;
use crate::engine::BYTES_PER_MB;
use crate::error::{Error, Result};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Appends lines to a file, rotating it once it reaches a size limit.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    /// Rotation threshold in MB, `None` when rotation is off.
    rotation_mb: Option<f64>,
    /// Current size of the open file.
    written: u64,
}

impl FileSink {
    /// Opens `path` for appending, creating parent directories as needed.
    ///
    /// # Arguments
    ///
    /// * `path` - Log file location
    /// * `rotation_mb` - Rotate once the file reaches this many MB
    pub fn open(path: impl AsRef<Path>, rotation_mb: Option<f64>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (file, written) = open_append(&path).map_err(|e| {
            error!("Error opening log file {}: {}", path.display(), e);
            e
        })?;
        info!("Opened log file: {}", path.display());

        Ok(Self {
            path,
            file: Some(BufWriter::new(file)),
            rotation_mb,
            written,
        })
    }

    /// The active log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the active file.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn needs_rotation(&self) -> bool {
        match self.rotation_mb {
            Some(limit) => self.written as f64 >= limit * BYTES_PER_MB,
            None => false,
        }
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }

        if self.path.exists() {
            let target = rotated_path(&self.path, &Local::now().format("%Y%m%d%H%M%S").to_string());
            let target = unique(target);
            fs::rename(&self.path, &target).map_err(|e| {
                error!("Error rotating log file {}: {}", self.path.display(), e);
                e
            })?;
            info!("Rotated log file to: {}", target.display());
        } else {
            warn!(
                "Log file {} does not exist. Skipping rotation.",
                self.path.display()
            );
        }

        let (file, written) = open_append(&self.path)?;
        info!("Created new log file: {}", self.path.display());
        self.file = Some(BufWriter::new(file));
        self.written = written;
        Ok(())
    }
}

impl OutputSink for FileSink {
    fn write(&mut self, lines: &[String]) -> Result<()> {
        if self.file.is_none() {
            error!("File handle is not open");
            return Err(Error::Output("file handle is not open".into()));
        }
        if self.needs_rotation() {
            self.rotate()?;
        }

        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Output("file handle is not open".into()))?;

        let mut bytes = 0u64;
        for line in lines {
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
            bytes += line.len() as u64 + 1;
        }
        file.flush()?;
        self.written += bytes;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|e| {
                error!("Error closing log file {}: {}", self.path.display(), e);
                e
            })?;
            info!("Closed log file: {}", self.path.display());
        }
        Ok(())
    }
}

/// `{stem}_{stamp}{.ext}` next to `path`.
///
/// ```rust
/// use logspout::rotated_path;
/// use std::path::Path;
///
/// let p = rotated_path(Path::new("logs/app.log"), "20240501103000");
/// assert_eq!(p, Path::new("logs/app_20240501103000.log"));
/// ```
pub fn rotated_path(path: &Path, stamp: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, stamp, ext.to_string_lossy()),
        None => format!("{}_{}", stem, stamp),
    };
    path.with_file_name(name)
}

/// Appends `_1`, `_2`, ... to the stem until `path` is free.
fn unique(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    (1u32..)
        .map(|n| rotated_path(&path, &n.to_string()))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}

fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let len = file.metadata()?.len();
    Ok((file, len))
}
