//! Error types for the updater.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced anywhere in the update engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Another updater run currently holds the lock.
    #[error("update already in progress (lock held by pid {0})")]
    LockBusy(u32),

    /// The release feed could not be reached.
    #[error("release feed unreachable: {0}")]
    Unreachable(String),

    /// The feed responded, but not with a well-formed release list.
    #[error("malformed release feed response: {0}")]
    MalformedFeed(String),

    /// A named asset does not exist on the release.
    #[error("asset '{0}' not found on release '{1}'")]
    AssetNotFound(String, String),

    /// Downloaded asset digest does not match the manifest entry.
    #[error("checksum mismatch for '{name}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Asset filename.
        name: String,
        /// Digest listed in the manifest.
        expected: String,
        /// Digest computed from the download.
        actual: String,
    },

    /// A downloaded binary is not a native executable for this platform.
    #[error("'{0}' is not a valid executable for this platform")]
    NotExecutable(PathBuf),

    /// Asset transfer failed mid-flight.
    #[error("transfer failed for '{0}': {1}")]
    Transfer(String, String),

    /// A tool metadata file is missing a required field.
    #[error("tool metadata '{path}' missing required field '{field}'")]
    MissingField {
        /// Metadata file that was being parsed.
        path: PathBuf,
        /// The absent key.
        field: String,
    },

    /// Supervisor operation (start/stop/query) failed.
    #[error("service supervisor error: {0}")]
    Supervisor(String),

    /// The relaunched core did not come up after the settle delay.
    #[error("core process failed verification after update to {0}")]
    VerifyFailed(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport error.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this condition defers the whole run to the next scheduled
    /// trigger with no side effects (lock busy, network gone, bad feed).
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        match self {
            Self::LockBusy(_) | Self::Unreachable(_) | Self::MalformedFeed(_) => true,
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

/// Result type for updater operations.
pub type Result<T> = std::result::Result<T, Error>;
