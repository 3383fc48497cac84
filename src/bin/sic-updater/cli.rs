//! Command-line interface definition.

use clap::Parser;
use sic_updater::UpdaterConfig;
use std::path::PathBuf;

/// Self-update engine for the sic suite.
#[derive(Parser, Debug)]
#[command(name = "sic-updater")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Report available updates without applying them.
    #[arg(long)]
    pub check_only: bool,

    /// Force a run (reserved; no effect beyond the normal flow).
    #[arg(long)]
    pub force: bool,

    /// Path to configuration file.
    #[arg(long, short, env = "SIC_UPDATER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,
}

impl Cli {
    /// Resolve the CLI arguments into an [`UpdaterConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be
    /// loaded.
    pub fn into_config(self) -> color_eyre::Result<UpdaterConfig> {
        let mut config = if let Some(ref path) = self.config {
            UpdaterConfig::from_file(path)?
        } else {
            UpdaterConfig::default()
        };
        config.log_level = self.log_level;
        Ok(config)
    }
}
