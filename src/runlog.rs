//! Append-only run log.
//!
//! The control panel tails this file, so it stays plain text: one
//! timestamped line per notable event. Rotation trims the file to its
//! newest lines once it grows past the configured budget; tracing
//! remains the separate diagnostic channel.

use crate::error::Result;
use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// Timestamped append-only log with bounded-tail rotation.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
    max_lines: usize,
}

impl RunLog {
    /// Open a log at `path`, keeping at most `max_lines` on rotation.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines,
        }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line. Best-effort: a logging failure never
    /// aborts a run.
    pub fn append(&self, message: &str) {
        if let Err(e) = self.try_append(message) {
            warn!("run log write failed: {e}");
        }
    }

    fn try_append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "{stamp}  {message}")?;
        Ok(())
    }

    /// Trim the log to its newest `max_lines` lines if oversized.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed replacement cannot be written.
    pub fn rotate(&self) -> Result<()> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return Ok(());
        };
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= self.max_lines {
            return Ok(());
        }

        let keep = &lines[lines.len() - self.max_lines..];
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        for line in keep {
            writeln!(tmp, "{line}")?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
