//! Asset download and integrity verification.
//!
//! Assets land in a per-run scratch directory and are only handed to the
//! updaters once their SHA-256 digest matches the release's checksum
//! manifest (when one is published) and, for binaries, once the payload
//! looks like a native executable for this platform.

use crate::error::{Error, Result};
use crate::feed::Release;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Published filename of the per-release checksum manifest.
pub const MANIFEST_ASSET: &str = "checksums.txt";

/// Parsed checksum manifest: filename to lowercase hex SHA-256.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: HashMap<String, String>,
}

impl Manifest {
    /// Parse manifest text: one `filename  hex-sha256` pair per line,
    /// whitespace separated. Malformed lines are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let first = fields.next()?;
                let second = fields.next()?;
                // Both "name hash" and sha256sum-style "hash  name" occur
                // in the wild; a 64-char hex field is the digest.
                if is_hex_digest(second) {
                    Some((first.to_string(), second.to_ascii_lowercase()))
                } else if is_hex_digest(first) {
                    Some((second.to_string(), first.to_ascii_lowercase()))
                } else {
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Expected digest for `filename`, if the manifest lists one.
    #[must_use]
    pub fn expected_digest(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(String::as_str)
    }

    /// Number of listed assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest lists no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Downloads release assets into a scratch directory and verifies them.
pub struct AssetVerifier {
    client: reqwest::Client,
    scratch: TempDir,
}

impl AssetVerifier {
    /// Create a verifier with its own scratch directory, reusing the
    /// feed's HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the scratch directory cannot be created.
    pub fn new(client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            client,
            scratch: TempDir::new()?,
        })
    }

    /// Scratch directory holding this run's downloads. Removed when the
    /// verifier is dropped.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    /// Download and parse the checksum manifest for `tag`, if published.
    ///
    /// Absence (or a failed transfer) disables verification for this
    /// update rather than failing it.
    pub async fn download_manifest(&self, tag: &str, releases: &[Release]) -> Option<Manifest> {
        match self.download(MANIFEST_ASSET, tag, releases).await {
            Ok(path) => match std::fs::read_to_string(&path) {
                Ok(text) => {
                    let manifest = Manifest::parse(&text);
                    debug!("manifest for {tag} lists {} assets", manifest.len());
                    Some(manifest)
                }
                Err(e) => {
                    warn!("manifest for {tag} unreadable: {e}");
                    None
                }
            },
            Err(e) => {
                debug!("no checksum manifest for {tag}: {e}");
                None
            }
        }
    }

    /// Download `filename` from the release tagged `tag` and verify it
    /// against `manifest` when one was supplied and lists the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetNotFound`] when no asset URL ends in
    /// `/filename`, [`Error::Transfer`] on a failed download, or
    /// [`Error::ChecksumMismatch`] when the digest disagrees with the
    /// manifest entry.
    pub async fn download_verified(
        &self,
        filename: &str,
        tag: &str,
        releases: &[Release],
        manifest: Option<&Manifest>,
    ) -> Result<PathBuf> {
        let path = self.download(filename, tag, releases).await?;

        if let Some(expected) = manifest.and_then(|m| m.expected_digest(filename)) {
            let actual = sha256_file(&path)?;
            if actual != expected {
                return Err(Error::ChecksumMismatch {
                    name: filename.to_string(),
                    expected: expected.to_string(),
                    actual,
                });
            }
            debug!("checksum ok for {filename}");
        } else {
            debug!("no manifest entry for {filename}, skipping verification");
        }

        Ok(path)
    }

    /// Like [`Self::download_verified`], additionally requiring the
    /// payload to be a well-formed native executable.
    ///
    /// # Errors
    ///
    /// As [`Self::download_verified`], plus [`Error::NotExecutable`] for
    /// payloads lacking the platform's executable magic.
    pub async fn download_verified_binary(
        &self,
        filename: &str,
        tag: &str,
        releases: &[Release],
        manifest: Option<&Manifest>,
    ) -> Result<PathBuf> {
        let path = self
            .download_verified(filename, tag, releases, manifest)
            .await?;
        if !is_native_executable(&path)? {
            return Err(Error::NotExecutable(path));
        }
        Ok(path)
    }

    async fn download(&self, filename: &str, tag: &str, releases: &[Release]) -> Result<PathBuf> {
        let suffix = format!("/{filename}");
        let url = crate::feed::asset_urls(tag, releases)
            .into_iter()
            .find(|u| u.ends_with(&suffix))
            .ok_or_else(|| Error::AssetNotFound(filename.to_string(), tag.to_string()))?
            .to_string();

        debug!("downloading {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transfer(filename.to_string(), e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transfer(
                filename.to_string(),
                format!("server returned {status}"),
            ));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transfer(filename.to_string(), e.to_string()))?;

        let path = self.scratch.path().join(filename);
        std::fs::write(&path, &bytes)?;
        Ok(path)
    }
}

/// Compute the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<String> {
    let content = std::fs::read(path)?;
    let digest = Sha256::digest(&content);
    Ok(hex::encode(digest))
}

/// Whether the file starts with this platform's executable magic.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn is_native_executable(path: &Path) -> Result<bool> {
    let content = std::fs::read(path)?;
    let Some(magic) = content.get(..4) else {
        return Ok(false);
    };
    Ok(NATIVE_MAGICS.iter().any(|m| magic == *m))
}

/// Mach-O thin (64/32-bit, both endians) and fat magics.
#[cfg(target_os = "macos")]
const NATIVE_MAGICS: &[[u8; 4]] = &[
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xfe, 0xed, 0xfa, 0xce],
    [0xca, 0xfe, 0xba, 0xbe],
    [0xbe, 0xba, 0xfe, 0xca],
];

/// ELF magic.
#[cfg(not(target_os = "macos"))]
const NATIVE_MAGICS: &[[u8; 4]] = &[[0x7f, b'E', b'L', b'F']];
