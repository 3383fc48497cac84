//! Durable component-version store.
//!
//! A single `key=value` text file mapping component id to installed
//! version, plus the `last-check` timestamp entry. This file is the sole
//! source of truth for "what is installed"; every mutation rewrites the
//! whole file to a tempfile in the same directory and renames it into
//! place, so readers never observe a partial write.

use crate::error::Result;
use crate::version::ComponentVersion;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Store key under which the last full-run timestamp is recorded.
pub const LAST_CHECK_KEY: &str = "last-check";

/// Key=value version store backed by one file.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    /// Open a store at `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Installed version for `component_id`, or `0.0.0` when the store
    /// or the entry does not exist.
    #[must_use]
    pub fn get(&self, component_id: &str) -> ComponentVersion {
        self.get_raw(component_id)
            .map_or(ComponentVersion::ZERO, |v| ComponentVersion::parse(&v))
    }

    /// Raw stored value for `key`, if present.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        content.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k == key).then(|| v.to_string())
        })
    }

    /// Record `version` for `component_id`, replacing any existing entry
    /// and preserving all others.
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement file cannot be written or
    /// renamed into place.
    pub fn set(&self, component_id: &str, version: ComponentVersion) -> Result<()> {
        self.set_raw(component_id, &version.to_string())
    }

    /// Record an arbitrary string value for `key` (used for `last-check`).
    ///
    /// # Errors
    ///
    /// Returns an error if the replacement file cannot be written or
    /// renamed into place.
    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let mut entries: Vec<(String, String)> = std::fs::read_to_string(&self.path)
            .unwrap_or_default()
            .lines()
            .filter_map(|line| {
                let (k, v) = line.split_once('=')?;
                (k != key).then(|| (k.to_string(), v.to_string()))
            })
            .collect();
        entries.push((key.to_string(), value.to_string()));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        for (k, v) in &entries {
            writeln!(tmp, "{k}={v}")?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
