//! Backup and replacement of managed files.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Single-generation backup of a component's managed files.
///
/// A new update overwrites the previous generation. The window between
/// backup-write and replacement is not crash-safe; that is a documented
/// limitation of the single-generation scheme.
#[derive(Debug, Clone)]
pub struct BackupSet {
    dir: PathBuf,
}

impl BackupSet {
    /// Backup location for `component_id` under `backup_root`.
    #[must_use]
    pub fn for_component(backup_root: &Path, component_id: &str) -> Self {
        Self {
            dir: backup_root.join(component_id),
        }
    }

    /// Directory holding this component's backed-up files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy each existing file into the backup set, overwriting the
    /// previous generation. Files that do not exist yet are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be created or a
    /// present file cannot be copied.
    pub fn capture(&self, files: &[PathBuf]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        for file in files {
            if !file.exists() {
                debug!("no existing {} to back up", file.display());
                continue;
            }
            let dest = self.dir.join(file_name(file));
            std::fs::copy(file, &dest)?;
        }
        Ok(())
    }

    /// Restore every backed-up file to its original location,
    /// preserving executable bits from the backup copy.
    ///
    /// # Errors
    ///
    /// Returns an error if a backed-up file cannot be copied back.
    pub fn restore(&self, files: &[PathBuf]) -> Result<()> {
        for file in files {
            let src = self.dir.join(file_name(file));
            if src.exists() {
                std::fs::copy(&src, file)?;
            }
        }
        Ok(())
    }

    /// Whether a backup copy of `file` exists.
    #[must_use]
    pub fn contains(&self, file: &Path) -> bool {
        self.dir.join(file_name(file)).exists()
    }
}

/// Install `src` over `dest`, creating parent directories and marking
/// the result executable when asked.
///
/// # Errors
///
/// Returns an error if the copy or permission change fails.
pub fn install_file(src: &Path, dest: &Path, executable: bool) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(src, dest)?;
    if executable {
        set_executable(dest)?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

fn file_name(path: &Path) -> std::ffi::OsString {
    path.file_name()
        .map_or_else(|| std::ffi::OsString::from("unnamed"), ToOwned::to_owned)
}
