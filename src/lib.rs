//! Self-update engine for the sic suite.
//!
//! A scheduler launches one run at a time: the run takes an exclusive
//! lock, fetches the published release list once, and brings the core
//! application and every installed tool up to the newest published
//! version — downloading, checksum-verifying, backing up, atomically
//! recording, and (for the core) rolling back if the new build fails to
//! come up.

pub mod component;
pub mod config;
pub mod error;
pub mod feed;
pub mod lock;
pub mod orchestrator;
pub mod runlog;
pub mod service;
pub mod store;
pub mod updater;
pub mod verify;
pub mod version;

pub use config::UpdaterConfig;
pub use error::{Error, Result};
pub use orchestrator::{Orchestrator, RunReport};
pub use updater::UpdateOutcome;
pub use version::ComponentVersion;
