//! Recording fakes for the supervisor and process-control seams.

use sic_updater::error::Result;
use sic_updater::service::{ProcessControl, ServiceSupervisor};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Fake service supervisor tracking active labels and recording calls.
#[derive(Clone, Default)]
pub struct FakeSupervisor {
    inner: Arc<Mutex<SupervisorState>>,
}

#[derive(Default)]
struct SupervisorState {
    active: HashSet<String>,
    calls: Vec<String>,
}

impl FakeSupervisor {
    /// Mark a labelled service as currently running.
    pub fn set_active(&self, label: &str) {
        self.inner.lock().unwrap().active.insert(label.to_string());
    }

    /// Whether the label is active now.
    pub fn is_active(&self, label: &str) -> bool {
        self.inner.lock().unwrap().active.contains(label)
    }

    /// Recorded calls, in order, as `op label` strings.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }
}

impl ServiceSupervisor for FakeSupervisor {
    fn is_running(&self, label: &str) -> Result<bool> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(format!("query {label}"));
        Ok(state.active.contains(label))
    }

    fn start(&self, label: &str) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(format!("start {label}"));
        state.active.insert(label.to_string());
        Ok(())
    }

    fn stop(&self, label: &str) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.calls.push(format!("stop {label}"));
        state.active.remove(label);
        Ok(())
    }
}

/// Fake process table for the core: launches succeed or leave the
/// process down, depending on `set_comes_up`.
#[derive(Clone)]
pub struct FakeProcessControl {
    inner: Arc<Mutex<ProcessState>>,
}

struct ProcessState {
    running: bool,
    comes_up: bool,
    launches: Vec<PathBuf>,
    terminations: usize,
}

impl Default for FakeProcessControl {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProcessState {
                running: true,
                comes_up: true,
                launches: Vec::new(),
                terminations: 0,
            })),
        }
    }
}

impl FakeProcessControl {
    /// Control whether future launches leave the process running.
    pub fn set_comes_up(&self, comes_up: bool) {
        self.inner.lock().unwrap().comes_up = comes_up;
    }

    /// Binaries launched, in order.
    pub fn launches(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().launches.clone()
    }

    /// How many times the process was terminated.
    pub fn terminations(&self) -> usize {
        self.inner.lock().unwrap().terminations
    }
}

impl ProcessControl for FakeProcessControl {
    fn is_running(&self, _process_name: &str) -> Result<bool> {
        Ok(self.inner.lock().unwrap().running)
    }

    fn terminate(&self, _process_name: &str) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.running = false;
        state.terminations += 1;
        Ok(())
    }

    fn launch(&self, path: &Path) -> Result<()> {
        let mut state = self.inner.lock().unwrap();
        state.launches.push(path.to_path_buf());
        state.running = state.comes_up;
        Ok(())
    }
}
