//! The run loop.
//!
//! One invocation is one run: rotate the log, take the lock, confirm the
//! feed is reachable, fetch the release list once, evaluate the core and
//! then every tool against it, and stamp the last-check time. Deferred
//! conditions (lock busy, network down, malformed feed) end the run with
//! no side effects beyond the log; a single component's failure is
//! contained and the remaining components are still evaluated.

use crate::component::{discover_tools, CORE_ID};
use crate::config::UpdaterConfig;
use crate::error::{Error, Result};
use crate::feed::ReleaseFeedClient;
use crate::lock::UpdateLock;
use crate::runlog::RunLog;
use crate::service::{ProcessControl, ServiceSupervisor};
use crate::store::{VersionStore, LAST_CHECK_KEY};
use crate::updater::{CoreUpdater, ToolUpdater, UpdateContext, UpdateOutcome};
use crate::verify::AssetVerifier;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What one run did, per component.
#[derive(Debug)]
pub struct RunReport {
    /// Why the run was deferred to the next trigger, if it was.
    pub deferred: Option<String>,
    /// Outcome per evaluated component id.
    pub components: Vec<(String, UpdateOutcome)>,
}

impl RunReport {
    fn deferred(reason: impl Into<String>) -> Self {
        Self {
            deferred: Some(reason.into()),
            components: Vec::new(),
        }
    }

    fn new() -> Self {
        Self {
            deferred: None,
            components: Vec::new(),
        }
    }
}

/// One-shot update run over all known components.
pub struct Orchestrator {
    config: UpdaterConfig,
    supervisor: Box<dyn ServiceSupervisor>,
    process: Box<dyn ProcessControl>,
}

impl Orchestrator {
    /// Build an orchestrator with explicit supervisor and process
    /// control implementations.
    #[must_use]
    pub fn new(
        config: UpdaterConfig,
        supervisor: Box<dyn ServiceSupervisor>,
        process: Box<dyn ProcessControl>,
    ) -> Self {
        Self {
            config,
            supervisor,
            process,
        }
    }

    /// Build an orchestrator wired to the host supervisor and process
    /// table.
    #[must_use]
    pub fn host(config: UpdaterConfig) -> Self {
        Self::new(
            config,
            Box::new(crate::service::HostSupervisor),
            Box::new(crate::service::HostProcessControl),
        )
    }

    /// Execute one run. In check-only mode available updates are
    /// reported but never applied.
    ///
    /// # Errors
    ///
    /// Returns an error only for unexpected local failures (lock file
    /// IO, store writes). Deferred conditions are reported in the
    /// [`RunReport`], not as errors.
    pub async fn run(&self, check_only: bool, force: bool) -> Result<RunReport> {
        let log = RunLog::new(&self.config.state.log_file, self.config.state.log_max_lines);
        if let Err(e) = log.rotate() {
            warn!("log rotation failed: {e}");
        }

        let _lock = match UpdateLock::acquire(&self.config.state.lock_file) {
            Ok(lock) => lock,
            Err(Error::LockBusy(pid)) => {
                debug!("another update run is in progress (pid {pid})");
                return Ok(RunReport::deferred("update already in progress"));
            }
            Err(e) => return Err(e),
        };

        let mode = if check_only { "check" } else { "update" };
        info!("starting {mode} run");
        log.append(&format!("run started ({mode})"));
        if force {
            debug!("force flag set (no effect beyond normal flow)");
        }

        let feed = ReleaseFeedClient::new(
            &self.config.feed.endpoint,
            Duration::from_secs(self.config.feed.timeout_secs),
            self.config.feed.token_file.as_deref(),
        )?;

        if let Err(e) = feed.probe().await {
            log.append("feed unreachable, deferring to next run");
            info!("deferring run: {e}");
            return Ok(RunReport::deferred(e.to_string()));
        }

        let releases = match feed.fetch_all().await {
            Ok(releases) => releases,
            Err(e) => {
                log.append(&format!("release fetch failed: {e}"));
                info!("deferring run: {e}");
                return Ok(RunReport::deferred(e.to_string()));
            }
        };

        let store = VersionStore::new(&self.config.state.version_file);
        let verifier = AssetVerifier::new(feed.http().clone())?;
        let ctx = UpdateContext {
            store: &store,
            verifier: &verifier,
            backup_root: &self.config.state.backup_dir,
            timing: &self.config.timing,
            log: &log,
        };

        let mut report = RunReport::new();

        // Core first, then every tool found in local metadata.
        let core = CoreUpdater::new(
            ctx,
            &self.config.core,
            self.process.as_ref(),
        );
        match core.pending_update(&releases) {
            Some((installed, latest)) if check_only => {
                log.append(&format!("core: update available {installed} -> {latest}"));
                report
                    .components
                    .push((CORE_ID.to_string(), UpdateOutcome::Available { installed, latest }));
            }
            Some(_) => match core.update(&releases).await {
                Ok(outcome) => report.components.push((CORE_ID.to_string(), outcome)),
                Err(e) => {
                    warn!("core update failed: {e}");
                    log.append(&format!("core: update failed: {e}"));
                }
            },
            None => {
                debug!("core is up to date");
                report
                    .components
                    .push((CORE_ID.to_string(), UpdateOutcome::UpToDate));
            }
        }

        let home = self.config.home();
        for tool in discover_tools(&self.config.state.tools_dir, &home) {
            let id = tool.component_id();
            if tool.tag.is_none() {
                // No update tag: excluded from checks entirely.
                debug!("{id} has no update tag, skipping");
                continue;
            }
            let updater = ToolUpdater::new(ctx, self.supervisor.as_ref());
            match updater.pending_update(&tool, &releases) {
                Some((installed, latest)) if check_only => {
                    log.append(&format!("{id}: update available {installed} -> {latest}"));
                    report
                        .components
                        .push((id, UpdateOutcome::Available { installed, latest }));
                }
                Some(_) => match updater.update(&tool, &releases).await {
                    Ok(outcome) => report.components.push((id, outcome)),
                    Err(e) => {
                        warn!("{id} update failed: {e}");
                        log.append(&format!("{id}: update failed: {e}"));
                    }
                },
                None => {
                    debug!("{id} is up to date");
                    report.components.push((id, UpdateOutcome::UpToDate));
                }
            }
        }

        if !check_only {
            store.set_raw(LAST_CHECK_KEY, &chrono::Utc::now().timestamp().to_string())?;
        }
        log.append("run complete");
        info!("{mode} run complete");
        Ok(report)
    }
}
