//! Component update orchestration.
//!
//! Two variants share the fetch/backup/replace machinery: the core
//! application (stop process, replace, relaunch, verify, roll back on a
//! failed relaunch) and supervised tools (stop service if active,
//! replace, restart — no rollback phase, matching the shipped behavior).

mod core;
mod files;
mod tool;

pub use self::core::CoreUpdater;
pub use files::BackupSet;
pub use tool::ToolUpdater;

use crate::config::TimingConfig;
use crate::runlog::RunLog;
use crate::store::VersionStore;
use crate::verify::AssetVerifier;
use crate::version::ComponentVersion;
use std::path::Path;

/// Shared state threaded through both updater variants.
#[derive(Clone, Copy)]
pub struct UpdateContext<'a> {
    /// Version store mutated on success or rollback.
    pub store: &'a VersionStore,
    /// Downloader/verifier for this run's assets.
    pub verifier: &'a AssetVerifier,
    /// Root directory for per-component backup sets.
    pub backup_root: &'a Path,
    /// Settle delays.
    pub timing: &'a TimingConfig,
    /// Run log for user-visible events.
    pub log: &'a RunLog,
}

/// Result of evaluating/applying one component update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Component replaced and verified at the new version.
    Updated {
        /// The version now installed.
        version: ComponentVersion,
    },
    /// Core came up broken after replacement; prior files and version
    /// were restored.
    RolledBack {
        /// The version restored.
        version: ComponentVersion,
        /// Why verification failed.
        reason: String,
    },
    /// Feed has nothing newer than the installed version.
    UpToDate,
    /// Check-only mode: an update exists but was not applied.
    Available {
        /// Currently installed version.
        installed: ComponentVersion,
        /// Newest published version.
        latest: ComponentVersion,
    },
}
