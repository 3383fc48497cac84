//! Release feed client.
//!
//! One bounded-timeout request fetches the full published release list;
//! everything after that is a read-only query over the in-memory set.
//! Releases are never cached to disk — each run sees the feed fresh.

use crate::error::{Error, Result};
use crate::version::ComponentVersion;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// A downloadable asset attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// Asset filename as published.
    pub name: String,
    /// Direct download URL.
    pub browser_download_url: String,
}

/// One published release: a tag plus its assets.
///
/// Tags encode the owning component as `<prefix>-v<version>`.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Tag name, e.g. `core-v1.3.0`.
    pub tag_name: String,
    /// Assets in published order.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Read-only client over the remote release feed.
pub struct ReleaseFeedClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl ReleaseFeedClient {
    /// Build a client for `endpoint` with a per-request `timeout`.
    ///
    /// `token_file`, if given and readable, supplies a bearer credential
    /// for private or rate-limited feeds; an unreadable file degrades to
    /// unauthenticated access.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration, token_file: Option<&Path>) -> Result<Self> {
        let token = token_file.and_then(|path| match std::fs::read_to_string(path) {
            Ok(content) => {
                let line = content.lines().next().unwrap_or("").trim().to_string();
                (!line.is_empty()).then_some(line)
            }
            Err(e) => {
                warn!("credential file {} unreadable: {e}", path.display());
                None
            }
        });

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sic-updater/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token,
        })
    }

    /// The underlying HTTP client, shared with the asset verifier.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Cheap reachability probe against the feed endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] if the endpoint does not answer
    /// within the timeout.
    pub async fn probe(&self) -> Result<()> {
        self.client
            .head(&self.endpoint)
            .send()
            .await
            .map_err(|e| Error::Unreachable(e.to_string()))?;
        Ok(())
    }

    /// Fetch the full release list in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport call fails or the response is
    /// not a well-formed release list.
    pub async fn fetch_all(&self) -> Result<Vec<Release>> {
        debug!("fetching release list from {}", self.endpoint);

        let mut request = self.client.get(&self.endpoint);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::MalformedFeed(format!("feed returned {status}")));
        }

        let body = response.text().await?;
        // Structural sanity check, not full schema validation: the body
        // must be a JSON array whose entries carry tag names.
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedFeed(format!("not JSON: {e}")))?;
        let entries = value
            .as_array()
            .ok_or_else(|| Error::MalformedFeed("response is not a release array".into()))?;
        if entries.iter().any(|r| r.get("tag_name").is_none()) {
            return Err(Error::MalformedFeed("release entry without tag_name".into()));
        }

        let releases: Vec<Release> = serde_json::from_value(value)
            .map_err(|e| Error::MalformedFeed(e.to_string()))?;
        debug!("feed published {} releases", releases.len());
        Ok(releases)
    }
}

/// Latest published version for `tag_prefix`, if any.
///
/// The feed is ordered newest-first, so the first tag matching
/// `<prefix>-v` wins; no sorting is applied.
#[must_use]
pub fn latest_version(tag_prefix: &str, releases: &[Release]) -> Option<ComponentVersion> {
    let needle = format!("{tag_prefix}-v");
    releases
        .iter()
        .find_map(|r| r.tag_name.strip_prefix(&needle))
        .map(ComponentVersion::parse)
}

/// All asset URLs on the release whose tag exactly matches `tag`.
#[must_use]
pub fn asset_urls<'a>(tag: &str, releases: &'a [Release]) -> Vec<&'a str> {
    releases
        .iter()
        .filter(|r| r.tag_name == tag)
        .flat_map(|r| r.assets.iter().map(|a| a.browser_download_url.as_str()))
        .collect()
}
