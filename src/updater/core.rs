//! Core component updater.
//!
//! The only variant with a verify/rollback phase: after replacing the
//! managed files the core is relaunched, and if it has not come up after
//! the settle delay the previous files and version record are restored.

use super::files::{install_file, BackupSet};
use super::{UpdateContext, UpdateOutcome};
use crate::component::CORE_ID;
use crate::config::CoreConfig;
use crate::error::Result;
use crate::feed::{latest_version, Release};
use crate::service::ProcessControl;
use crate::version::ComponentVersion;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Updater for the core application.
pub struct CoreUpdater<'a> {
    ctx: UpdateContext<'a>,
    config: &'a CoreConfig,
    process: &'a dyn ProcessControl,
}

impl<'a> CoreUpdater<'a> {
    /// Build a core updater over the shared run context.
    #[must_use]
    pub fn new(
        ctx: UpdateContext<'a>,
        config: &'a CoreConfig,
        process: &'a dyn ProcessControl,
    ) -> Self {
        Self {
            ctx,
            config,
            process,
        }
    }

    /// Installed and newest published core versions, when the feed
    /// publishes something newer.
    #[must_use]
    pub fn pending_update(
        &self,
        releases: &[Release],
    ) -> Option<(ComponentVersion, ComponentVersion)> {
        let installed = self.ctx.store.get(CORE_ID);
        let latest = latest_version(&self.config.tag_prefix, releases)?;
        (latest > installed).then_some((installed, latest))
    }

    /// Run the full update state machine, terminal on first failure.
    ///
    /// # Errors
    ///
    /// Returns an asset error (not found, checksum mismatch, bad
    /// executable, transfer failure) when fetching fails — in that case
    /// nothing on disk has been touched — or an IO/store error from the
    /// replacement phase.
    pub async fn update(&self, releases: &[Release]) -> Result<UpdateOutcome> {
        let Some((installed, latest)) = self.pending_update(releases) else {
            return Ok(UpdateOutcome::UpToDate);
        };
        let tag = format!("{}-v{latest}", self.config.tag_prefix);
        info!("core update available: {installed} -> {latest}");
        self.ctx.log.append(&format!("core: updating {installed} -> {latest}"));

        // Fetch everything up front; nothing on disk is touched until
        // all three assets have been verified.
        let manifest = self.ctx.verifier.download_manifest(&tag, releases).await;
        let new_binary = self
            .ctx
            .verifier
            .download_verified_binary(&self.asset_name(&self.config.binary), &tag, releases, manifest.as_ref())
            .await?;
        let new_script = self
            .ctx
            .verifier
            .download_verified(&self.asset_name(&self.config.script), &tag, releases, manifest.as_ref())
            .await?;
        let new_metadata = self
            .ctx
            .verifier
            .download_verified(&self.asset_name(&self.config.metadata), &tag, releases, manifest.as_ref())
            .await?;

        let managed = self.managed_files();
        let backup = BackupSet::for_component(self.ctx.backup_root, CORE_ID);
        backup.capture(&managed)?;

        self.process.terminate(&self.config.process_name)?;
        tokio::time::sleep(Duration::from_millis(self.ctx.timing.stop_settle_ms)).await;

        install_file(&new_binary, &self.config.binary, true)?;
        install_file(&new_script, &self.config.script, true)?;
        install_file(&new_metadata, &self.config.metadata, false)?;
        self.ctx
            .log
            .append("core: companion script replaced, effective next run");

        // Record before relaunch so the new process observes its own
        // version immediately.
        self.ctx.store.set(CORE_ID, latest)?;

        self.process.launch(&self.config.binary)?;
        tokio::time::sleep(Duration::from_millis(self.ctx.timing.verify_settle_ms)).await;

        if self.process.is_running(&self.config.process_name)? {
            info!("core updated to {latest}");
            self.ctx.log.append(&format!("core: updated to {latest}"));
            return Ok(UpdateOutcome::Updated { version: latest });
        }

        // Verification failed: end the run in the pre-update state.
        warn!("core {latest} failed to come up, rolling back to {installed}");
        self.ctx.store.set(CORE_ID, installed)?;
        backup.restore(&managed)?;
        if let Err(e) = self.process.launch(&self.config.binary) {
            warn!("relaunch of restored core failed: {e}");
        }
        self.ctx
            .log
            .append(&format!("core: update to {latest} failed, rolled back to {installed}"));
        Ok(UpdateOutcome::RolledBack {
            version: installed,
            reason: format!("core process not running after update to {latest}"),
        })
    }

    fn managed_files(&self) -> Vec<PathBuf> {
        vec![
            self.config.binary.clone(),
            self.config.script.clone(),
            self.config.metadata.clone(),
        ]
    }

    fn asset_name(&self, path: &std::path::Path) -> String {
        path.file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
    }
}
