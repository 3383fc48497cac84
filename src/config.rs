//! Configuration for sic-updater.
//!
//! All paths are resolved to absolute form at load time; nothing
//! downstream re-interprets `~` or relative segments.

use crate::component::expand_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Updater configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Release feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Core component settings.
    #[serde(default)]
    pub core: CoreConfig,

    /// State and log file locations.
    #[serde(default)]
    pub state: StateConfig,

    /// Settle delays around service stop/start.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Release feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Release list endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Optional bearer-token file for private/rate-limited feeds.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

/// Core component settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Installed core binary.
    #[serde(default = "default_core_binary")]
    pub binary: PathBuf,

    /// Companion update script (self-referential: a replaced copy only
    /// takes effect on the next scheduled run).
    #[serde(default = "default_core_script")]
    pub script: PathBuf,

    /// Core metadata file.
    #[serde(default = "default_core_metadata")]
    pub metadata: PathBuf,

    /// Process name the core runs under.
    #[serde(default = "default_core_process")]
    pub process_name: String,

    /// Update-tag prefix for core releases.
    #[serde(default = "default_core_tag")]
    pub tag_prefix: String,
}

/// State and log file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Version store file.
    #[serde(default = "default_version_file")]
    pub version_file: PathBuf,

    /// Run-lock marker file.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,

    /// Per-component backup directory.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Tool metadata directory (`*.conf`).
    #[serde(default = "default_tools_dir")]
    pub tools_dir: PathBuf,

    /// Run log file.
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Rotation keeps at most this many newest log lines.
    #[serde(default = "default_log_max_lines")]
    pub log_max_lines: usize,
}

/// Settle delays around service stop/start, in milliseconds so tests
/// can shrink them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after stopping a process/service before replacing files.
    #[serde(default = "default_stop_settle")]
    pub stop_settle_ms: u64,

    /// Pause after relaunching the core before verifying it is up.
    #[serde(default = "default_verify_settle")]
    pub verify_settle_ms: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            feed: FeedConfig::default(),
            core: CoreConfig::default(),
            state: StateConfig::default(),
            timing: TimingConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout(),
            token_file: None,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            binary: default_core_binary(),
            script: default_core_script(),
            metadata: default_core_metadata(),
            process_name: default_core_process(),
            tag_prefix: default_core_tag(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            version_file: default_version_file(),
            lock_file: default_lock_file(),
            backup_dir: default_backup_dir(),
            tools_dir: default_tools_dir(),
            log_file: default_log_file(),
            log_max_lines: default_log_max_lines(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stop_settle_ms: default_stop_settle(),
            verify_settle_ms: default_verify_settle(),
        }
    }
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "sic")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".sic"))
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/"))
}

fn default_endpoint() -> String {
    "https://api.github.com/repos/sic-suite/sic/releases?per_page=100".to_string()
}

const fn default_timeout() -> u64 {
    30
}

fn default_core_binary() -> PathBuf {
    data_dir().join("bin/sic-core")
}

fn default_core_script() -> PathBuf {
    data_dir().join("bin/sic-update.sh")
}

fn default_core_metadata() -> PathBuf {
    data_dir().join("core.conf")
}

fn default_core_process() -> String {
    "sic-core".to_string()
}

fn default_core_tag() -> String {
    "core".to_string()
}

fn default_version_file() -> PathBuf {
    data_dir().join("versions")
}

fn default_lock_file() -> PathBuf {
    data_dir().join("update.lock")
}

fn default_backup_dir() -> PathBuf {
    data_dir().join("backup")
}

fn default_tools_dir() -> PathBuf {
    data_dir().join("tools")
}

fn default_log_file() -> PathBuf {
    data_dir().join("update.log")
}

const fn default_log_max_lines() -> usize {
    500
}

const fn default_stop_settle() -> u64 {
    1000
}

const fn default_verify_settle() -> u64 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl UpdaterConfig {
    /// Load configuration from a TOML file and resolve all paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.resolve_paths(&home_dir());
        Ok(config)
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The home directory used for `~/` expansion in tool metadata.
    #[must_use]
    pub fn home(&self) -> PathBuf {
        home_dir()
    }

    /// Expand `~/` in every configured path against `home`. Called once
    /// at load; paths are absolute from here on.
    pub fn resolve_paths(&mut self, home: &Path) {
        let resolve = |p: &mut PathBuf| {
            if let Some(s) = p.to_str() {
                *p = expand_home(s, home);
            }
        };
        resolve(&mut self.core.binary);
        resolve(&mut self.core.script);
        resolve(&mut self.core.metadata);
        resolve(&mut self.state.version_file);
        resolve(&mut self.state.lock_file);
        resolve(&mut self.state.backup_dir);
        resolve(&mut self.state.tools_dir);
        resolve(&mut self.state.log_file);
        if let Some(token) = &mut self.feed.token_file {
            resolve(token);
        }
    }
}
