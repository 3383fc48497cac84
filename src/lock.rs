//! Cross-invocation run lock.
//!
//! The scheduler fires updater runs on a fixed interval; a slow download
//! can still be in flight when the next trigger lands. A pid-bearing
//! marker file keeps at most one live run system-wide. The marker is
//! liveness-checked, not just existence-checked: a marker left behind by
//! a crashed run is reclaimed.

use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Exclusive lock over updater runs, released on drop.
#[derive(Debug)]
pub struct UpdateLock {
    path: PathBuf,
}

impl UpdateLock {
    /// Acquire the lock at `path`.
    ///
    /// A stale marker (owner no longer alive) is removed and the lock
    /// taken over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockBusy`] if a live run owns the marker, or an
    /// IO error if the marker cannot be created.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if path.exists() {
            match read_owner(&path) {
                Some(pid) if process_alive(pid) => return Err(Error::LockBusy(pid)),
                Some(pid) => {
                    debug!("reclaiming stale lock from dead pid {pid}");
                    std::fs::remove_file(&path)?;
                }
                // Unreadable marker: no live owner to respect.
                None => std::fs::remove_file(&path)?,
            }
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // create_new is atomic: if a racing run won, we observe it as busy.
        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let pid = read_owner(&path).unwrap_or(0);
                return Err(Error::LockBusy(pid));
            }
            Err(e) => return Err(e.into()),
        };
        write!(file, "{}", std::process::id())?;

        Ok(Self { path })
    }

    /// Path of the marker file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UpdateLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("failed to remove lock marker {}: {e}", self.path.display());
        }
    }
}

fn read_owner(path: &Path) -> Option<u32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.trim().parse().ok()
}

/// `kill -0` probes for existence without signalling.
fn process_alive(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
