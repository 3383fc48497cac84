//! Service supervisor and process control seams.
//!
//! The updater never learns supervisor internals: it asks for start,
//! stop, and is-running by label (tools) or manipulates the core process
//! by name. Both seams are traits so the e2e harness can substitute
//! recording fakes.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Start/stop/query a supervised background service by label.
pub trait ServiceSupervisor {
    /// Whether the labelled service is currently loaded and running.
    ///
    /// # Errors
    ///
    /// Returns an error if the supervisor cannot be queried.
    fn is_running(&self, label: &str) -> Result<bool>;

    /// Start the labelled service.
    ///
    /// # Errors
    ///
    /// Returns an error if the supervisor rejects the request.
    fn start(&self, label: &str) -> Result<()>;

    /// Stop the labelled service.
    ///
    /// # Errors
    ///
    /// Returns an error if the supervisor rejects the request.
    fn stop(&self, label: &str) -> Result<()>;
}

/// Terminate/launch/query an unsupervised process by name.
pub trait ProcessControl {
    /// Whether a process with this name is currently running.
    ///
    /// # Errors
    ///
    /// Returns an error if the process table cannot be queried.
    fn is_running(&self, process_name: &str) -> Result<bool>;

    /// Terminate every process with this name, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if termination cannot be requested.
    fn terminate(&self, process_name: &str) -> Result<()>;

    /// Launch the binary at `path`, detached from this run.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn launch(&self, path: &Path) -> Result<()>;
}

/// Host supervisor backed by launchctl (macOS) or `systemctl --user`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSupervisor;

impl ServiceSupervisor for HostSupervisor {
    #[cfg(target_os = "macos")]
    fn is_running(&self, label: &str) -> Result<bool> {
        // `launchctl list <label>` exits zero only for loaded jobs.
        let status = quiet_command("launchctl", &["list", label])?;
        Ok(status)
    }

    #[cfg(not(target_os = "macos"))]
    fn is_running(&self, label: &str) -> Result<bool> {
        quiet_command("systemctl", &["--user", "is-active", "--quiet", label])
    }

    #[cfg(target_os = "macos")]
    fn start(&self, label: &str) -> Result<()> {
        run_command("launchctl", &["start", label])
    }

    #[cfg(not(target_os = "macos"))]
    fn start(&self, label: &str) -> Result<()> {
        run_command("systemctl", &["--user", "start", label])
    }

    #[cfg(target_os = "macos")]
    fn stop(&self, label: &str) -> Result<()> {
        run_command("launchctl", &["stop", label])
    }

    #[cfg(not(target_os = "macos"))]
    fn stop(&self, label: &str) -> Result<()> {
        run_command("systemctl", &["--user", "stop", label])
    }
}

/// Host process control backed by pgrep/pkill and a detached spawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProcessControl;

impl ProcessControl for HostProcessControl {
    fn is_running(&self, process_name: &str) -> Result<bool> {
        quiet_command("pgrep", &["-x", process_name])
    }

    fn terminate(&self, process_name: &str) -> Result<()> {
        debug!("terminating process '{process_name}'");
        // Exit status 1 just means no such process; that is fine here.
        quiet_command("pkill", &["-x", process_name])?;
        Ok(())
    }

    fn launch(&self, path: &Path) -> Result<()> {
        debug!("launching {}", path.display());
        Command::new(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Supervisor(format!("launch {}: {e}", path.display())))?;
        Ok(())
    }
}

/// Run a command for its exit status, discarding output.
fn quiet_command(program: &str, args: &[&str]) -> Result<bool> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| Error::Supervisor(format!("{program}: {e}")))?;
    Ok(output.success())
}

/// Run a command that must succeed.
fn run_command(program: &str, args: &[&str]) -> Result<()> {
    if quiet_command(program, args)? {
        Ok(())
    } else {
        Err(Error::Supervisor(format!(
            "{program} {} failed",
            args.join(" ")
        )))
    }
}
