//! Tool component updater.
//!
//! Tools are supervised services: if one is active it is stopped before
//! replacement and restarted afterwards. Unlike the core there is no
//! verify/rollback phase — a failed download or verification simply
//! leaves the tool at its previous version for this run.

use super::files::{install_file, BackupSet};
use super::{UpdateContext, UpdateOutcome};
use crate::component::ToolManifest;
use crate::error::Result;
use crate::feed::{latest_version, Release};
use crate::service::ServiceSupervisor;
use crate::version::ComponentVersion;
use std::time::Duration;
use tracing::{debug, info};

/// Updater for one supervised tool.
pub struct ToolUpdater<'a> {
    ctx: UpdateContext<'a>,
    supervisor: &'a dyn ServiceSupervisor,
}

impl<'a> ToolUpdater<'a> {
    /// Build a tool updater over the shared run context.
    #[must_use]
    pub fn new(ctx: UpdateContext<'a>, supervisor: &'a dyn ServiceSupervisor) -> Self {
        Self { ctx, supervisor }
    }

    /// Installed and newest published versions for `tool`, when the
    /// feed publishes something newer. `None` also covers tools without
    /// an update tag — those are excluded from checks entirely.
    #[must_use]
    pub fn pending_update(
        &self,
        tool: &ToolManifest,
        releases: &[Release],
    ) -> Option<(ComponentVersion, ComponentVersion)> {
        let tag_prefix = tool.tag.as_deref()?;
        let installed = self.ctx.store.get(&tool.component_id());
        let latest = latest_version(tag_prefix, releases)?;
        (latest > installed).then_some((installed, latest))
    }

    /// Update one tool: fetch and verify, back up, stop if active,
    /// replace, restart if it had been active, record the new version.
    ///
    /// # Errors
    ///
    /// Returns an asset, supervisor, or IO error; the orchestrator
    /// contains it to this tool and moves on.
    pub async fn update(&self, tool: &ToolManifest, releases: &[Release]) -> Result<UpdateOutcome> {
        let Some((installed, latest)) = self.pending_update(tool, releases) else {
            return Ok(UpdateOutcome::UpToDate);
        };
        // pending_update returned Some, so the tag is present.
        let Some(tag_prefix) = tool.tag.as_deref() else {
            return Ok(UpdateOutcome::UpToDate);
        };
        let tag = format!("{tag_prefix}-v{latest}");
        let id = tool.component_id();
        info!("{id} update available: {installed} -> {latest}");
        self.ctx
            .log
            .append(&format!("{id}: updating {installed} -> {latest}"));

        let manifest = self.ctx.verifier.download_manifest(&tag, releases).await;

        // Fetch every published piece before touching the install.
        let mut staged: Vec<(std::path::PathBuf, std::path::PathBuf, bool)> = Vec::new();
        if let Some(script) = &tool.script {
            let fetched = self
                .ctx
                .verifier
                .download_verified(&asset_name(script), &tag, releases, manifest.as_ref())
                .await?;
            staged.push((fetched, script.clone(), true));
        }
        if let Some(binary) = &tool.binary {
            let fetched = self
                .ctx
                .verifier
                .download_verified_binary(&asset_name(binary), &tag, releases, manifest.as_ref())
                .await?;
            staged.push((fetched, binary.clone(), true));
        }
        let new_metadata = self
            .ctx
            .verifier
            .download_verified(&asset_name(&tool.path), &tag, releases, manifest.as_ref())
            .await?;
        staged.push((new_metadata, tool.path.clone(), false));

        let managed = tool.managed_files();
        let backup = BackupSet::for_component(self.ctx.backup_root, &id);
        backup.capture(&managed)?;

        let was_active = self.supervisor.is_running(&tool.label)?;
        if was_active {
            debug!("stopping service {}", tool.label);
            self.supervisor.stop(&tool.label)?;
            tokio::time::sleep(Duration::from_millis(self.ctx.timing.stop_settle_ms)).await;
        }

        for (src, dest, executable) in &staged {
            install_file(src, dest, *executable)?;
        }

        if was_active {
            debug!("restarting service {}", tool.label);
            self.supervisor.start(&tool.label)?;
        }

        self.ctx.store.set(&id, latest)?;
        info!("{id} updated to {latest}");
        self.ctx.log.append(&format!("{id}: updated to {latest}"));
        Ok(UpdateOutcome::Updated { version: latest })
    }
}

fn asset_name(path: &std::path::Path) -> String {
    path.file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
}
