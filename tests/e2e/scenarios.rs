//! End-to-end update scenarios.

use super::feed_server::ReleaseSpec;
use super::harness::{native_binary, UpdaterHarness};
use sic_updater::store::LAST_CHECK_KEY;
use sic_updater::version::ComponentVersion;
use sic_updater::UpdateOutcome;

/// A newer core release with matching checksums and a working relaunch
/// is installed, recorded, and the old build kept as the backup.
#[tokio::test]
async fn core_update_installs_and_keeps_backup() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    harness.feed.publish(&[ReleaseSpec::new(
        "core-v1.3.0",
        UpdaterHarness::core_assets("1.3.0"),
    )]);

    let report = harness.orchestrator().run(false, false).await.unwrap();

    assert_eq!(report.deferred, None);
    assert!(report
        .components
        .iter()
        .any(|(id, outcome)| id == "core"
            && *outcome
                == UpdateOutcome::Updated {
                    version: ComponentVersion::new(1, 3, 0)
                }));

    let store = harness.store();
    assert_eq!(store.get("core"), ComponentVersion::new(1, 3, 0));
    assert!(store.get_raw(LAST_CHECK_KEY).is_some());

    assert_eq!(
        std::fs::read(&harness.config.core.binary).unwrap(),
        native_binary("1.3.0")
    );
    // The backup set holds the previous generation.
    assert_eq!(
        std::fs::read(harness.config.state.backup_dir.join("core/sic-core")).unwrap(),
        native_binary("1.2.0")
    );

    assert_eq!(harness.process.terminations(), 1);
    assert_eq!(
        harness.process.launches(),
        vec![harness.config.core.binary.clone()]
    );
}

/// If the relaunched core does not come up, the run ends byte-identical
/// to its pre-update state: files restored, version record restored,
/// restored build relaunched.
#[tokio::test]
async fn failed_core_relaunch_rolls_back() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    harness.process.set_comes_up(false);
    harness.feed.publish(&[ReleaseSpec::new(
        "core-v1.3.0",
        UpdaterHarness::core_assets("1.3.0"),
    )]);

    let report = harness.orchestrator().run(false, false).await.unwrap();

    assert!(report
        .components
        .iter()
        .any(|(id, outcome)| id == "core"
            && matches!(outcome, UpdateOutcome::RolledBack { version, .. }
                if *version == ComponentVersion::new(1, 2, 0))));

    assert_eq!(harness.store().get("core"), ComponentVersion::new(1, 2, 0));
    assert_eq!(
        std::fs::read(&harness.config.core.binary).unwrap(),
        native_binary("1.2.0")
    );
    assert_eq!(
        std::fs::read(&harness.config.core.script).unwrap(),
        std::fs::read(harness.config.state.backup_dir.join("core/sic-update.sh")).unwrap()
    );
    // One launch for the new build, one for the restored build.
    assert_eq!(harness.process.launches().len(), 2);
}

/// A manifest mismatch on any asset leaves the install and the version
/// store completely untouched.
#[tokio::test]
async fn checksum_mismatch_changes_nothing() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    let mut spec = ReleaseSpec::new("core-v1.3.0", UpdaterHarness::core_assets("1.3.0"));
    spec.corrupt_digest_for = Some("sic-core".to_string());
    harness.feed.publish(&[spec]);

    let report = harness.orchestrator().run(false, false).await.unwrap();

    // The failure is contained: the run completes, but no core outcome
    // is reported and nothing was modified.
    assert_eq!(report.deferred, None);
    assert!(!report.components.iter().any(|(id, _)| id == "core"));
    assert_eq!(harness.store().get("core"), ComponentVersion::new(1, 2, 0));
    assert_eq!(
        std::fs::read(&harness.config.core.binary).unwrap(),
        native_binary("1.2.0")
    );
    assert_eq!(harness.process.terminations(), 0);

    let log = std::fs::read_to_string(&harness.config.state.log_file).unwrap();
    assert!(log.contains("core: update failed"), "log was:\n{log}");
}

/// A payload without the platform's executable magic is rejected the
/// same way a checksum failure is.
#[tokio::test]
async fn non_executable_binary_is_rejected() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    let mut assets = UpdaterHarness::core_assets("1.3.0");
    assets[0].1 = b"<html>404 page pretending to be a binary</html>".to_vec();
    harness.feed.publish(&[ReleaseSpec::new("core-v1.3.0", assets)]);

    harness.orchestrator().run(false, false).await.unwrap();

    assert_eq!(harness.store().get("core"), ComponentVersion::new(1, 2, 0));
    assert_eq!(
        std::fs::read(&harness.config.core.binary).unwrap(),
        native_binary("1.2.0")
    );
}

/// A tool whose metadata has no update tag is excluded entirely: no
/// feed asset referencing it is ever requested.
#[tokio::test]
async fn untagged_tool_is_skipped() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    harness.install_tool("quiet", None, "0.9.0");
    harness.feed.publish(&[ReleaseSpec::new(
        "tool-quiet-v9.9.9",
        vec![("quiet.sh".to_string(), b"new".to_vec())],
    )]);

    let report = harness.orchestrator().run(false, false).await.unwrap();

    assert!(!report.components.iter().any(|(id, _)| id == "tool-quiet"));
    assert_eq!(
        harness.store().get("tool-quiet"),
        ComponentVersion::new(0, 9, 0)
    );
    assert!(
        !harness
            .feed
            .requests()
            .iter()
            .any(|r| r.contains("tool-quiet")),
        "no network call may reference an untagged tool"
    );
}

/// An active tool is stopped before replacement and restarted after,
/// and its new version is recorded.
#[tokio::test]
async fn active_tool_updates_with_restart() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    let script = harness.install_tool("shot", Some("tool-shot"), "0.9.0");
    harness.supervisor.set_active("com.sic.shot");
    harness.feed.publish(&[ReleaseSpec::new(
        "tool-shot-v1.0.0",
        vec![
            ("shot.sh".to_string(), b"#!/bin/sh\n# shot 1.0.0\n".to_vec()),
            ("shot.conf".to_string(), b"name=shot\nversion=1.0.0\n".to_vec()),
        ],
    )]);

    harness.orchestrator().run(false, false).await.unwrap();

    assert_eq!(
        harness.store().get("tool-shot"),
        ComponentVersion::new(1, 0, 0)
    );
    assert_eq!(
        std::fs::read(&script).unwrap(),
        b"#!/bin/sh\n# shot 1.0.0\n"
    );
    assert!(harness.supervisor.is_active("com.sic.shot"));

    let calls = harness.supervisor.calls();
    let stop = calls.iter().position(|c| c == "stop com.sic.shot");
    let start = calls.iter().position(|c| c == "start com.sic.shot");
    assert!(stop.is_some() && start.is_some() && stop < start, "{calls:?}");
}

/// An inactive tool is replaced without ever being started.
#[tokio::test]
async fn inactive_tool_updates_without_restart() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    harness.install_tool("shot", Some("tool-shot"), "0.9.0");
    harness.feed.publish(&[ReleaseSpec::new(
        "tool-shot-v1.0.0",
        vec![
            ("shot.sh".to_string(), b"#!/bin/sh\n# shot 1.0.0\n".to_vec()),
            ("shot.conf".to_string(), b"name=shot\nversion=1.0.0\n".to_vec()),
        ],
    )]);

    harness.orchestrator().run(false, false).await.unwrap();

    assert_eq!(
        harness.store().get("tool-shot"),
        ComponentVersion::new(1, 0, 0)
    );
    let calls = harness.supervisor.calls();
    assert!(!calls.iter().any(|c| c.starts_with("start")), "{calls:?}");
    assert!(!calls.iter().any(|c| c.starts_with("stop")), "{calls:?}");
}

/// Check-only mode reports available updates without applying anything
/// or stamping the last-check time.
#[tokio::test]
async fn check_only_reports_without_applying() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    harness.feed.publish(&[ReleaseSpec::new(
        "core-v1.3.0",
        UpdaterHarness::core_assets("1.3.0"),
    )]);

    let report = harness.orchestrator().run(true, false).await.unwrap();

    assert!(report
        .components
        .iter()
        .any(|(id, outcome)| id == "core"
            && *outcome
                == UpdateOutcome::Available {
                    installed: ComponentVersion::new(1, 2, 0),
                    latest: ComponentVersion::new(1, 3, 0),
                }));
    assert_eq!(harness.store().get("core"), ComponentVersion::new(1, 2, 0));
    assert_eq!(harness.store().get_raw(LAST_CHECK_KEY), None);
    assert_eq!(
        std::fs::read(&harness.config.core.binary).unwrap(),
        native_binary("1.2.0")
    );
    assert!(harness.process.launches().is_empty());
}

/// An unreachable feed defers the run: log only, store and files
/// untouched, lock released.
#[tokio::test]
async fn unreachable_feed_defers_the_run() {
    let mut harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    // A port that was just bound and released: connection refused.
    let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = closed.local_addr().unwrap();
    drop(closed);
    harness.config.feed.endpoint = format!("http://{addr}/releases");

    let report = harness.orchestrator().run(false, false).await.unwrap();

    assert!(report.deferred.is_some());
    assert!(report.components.is_empty());
    assert_eq!(harness.store().get("core"), ComponentVersion::new(1, 2, 0));
    assert_eq!(harness.store().get_raw(LAST_CHECK_KEY), None);
    assert!(
        !harness.config.state.lock_file.exists(),
        "lock released on the deferred path"
    );
}

/// A response that is not a release list defers the run the same way.
#[tokio::test]
async fn malformed_feed_defers_the_run() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    harness.feed.set_releases_raw(b"{\"message\": \"rate limited\"}");

    let report = harness.orchestrator().run(false, false).await.unwrap();

    assert!(report.deferred.is_some());
    assert_eq!(harness.store().get_raw(LAST_CHECK_KEY), None);
    assert!(!harness.config.state.lock_file.exists());
}

/// A live concurrent run makes this one bow out without touching
/// anything, and without removing the other run's lock.
#[tokio::test]
async fn concurrent_run_defers_silently() {
    let harness = UpdaterHarness::setup().await;
    harness.install_core("1.2.0");
    std::fs::create_dir_all(harness.config.state.lock_file.parent().unwrap()).unwrap();
    // Our own pid is definitely alive.
    std::fs::write(&harness.config.state.lock_file, std::process::id().to_string()).unwrap();

    let report = harness.orchestrator().run(false, false).await.unwrap();

    assert!(report.deferred.is_some());
    assert!(harness.config.state.lock_file.exists());
    assert_eq!(harness.store().get_raw(LAST_CHECK_KEY), None);
    assert!(harness.feed.requests().is_empty(), "no network traffic");
}
