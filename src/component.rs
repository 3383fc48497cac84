//! Component model and tool metadata.
//!
//! The installer drops one `key=value` metadata file per tool into the
//! tools directory; this subsystem only reads them. Parsing produces a
//! fully populated record or a named missing-field error, and path
//! values are resolved to absolute paths right here, never downstream.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Component id of the core application.
pub const CORE_ID: &str = "core";

/// Store id for a tool: `tool-<name>`.
#[must_use]
pub fn tool_id(name: &str) -> String {
    format!("tool-{name}")
}

/// Metadata record for one installed tool.
#[derive(Debug, Clone)]
pub struct ToolManifest {
    /// Tool name, unique within the suite.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Service label the supervisor knows the tool by.
    pub label: String,
    /// Supervisor descriptor (plist/unit) path.
    pub plist: PathBuf,
    /// Managed script path, if the tool ships one.
    pub script: Option<PathBuf>,
    /// Managed binary path, if the tool ships one.
    pub binary: Option<PathBuf>,
    /// Version bundled at install time.
    pub version: Option<String>,
    /// Update-tag prefix; absent excludes the tool from update checks.
    pub tag: Option<String>,
    /// The metadata file itself (replaced on update).
    pub path: PathBuf,
}

impl ToolManifest {
    /// Parse a metadata file. Path values with a leading `~/` are
    /// expanded against `home`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] naming the first absent required
    /// key (`name`, `label`, or `plist`), or an IO error if the file
    /// cannot be read.
    pub fn parse(path: &Path, home: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fields: HashMap<&str, &str> = content
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        let required = |key: &str| -> Result<String> {
            fields
                .get(key)
                .copied()
                .filter(|v| !v.is_empty())
                .map(String::from)
                .ok_or_else(|| Error::MissingField {
                    path: path.to_path_buf(),
                    field: key.to_string(),
                })
        };
        let optional = |key: &str| {
            fields
                .get(key)
                .copied()
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        let optional_path = |key: &str| optional(key).map(|v| expand_home(&v, home));

        Ok(Self {
            name: required("name")?,
            description: optional("description"),
            label: required("label")?,
            plist: expand_home(&required("plist")?, home),
            script: optional_path("script"),
            binary: optional_path("binary"),
            version: optional("version"),
            tag: optional("tag"),
            path: path.to_path_buf(),
        })
    }

    /// Component id used in the version store.
    #[must_use]
    pub fn component_id(&self) -> String {
        tool_id(&self.name)
    }

    /// The files this tool's updates manage: script and binary when
    /// present, plus the metadata file itself.
    #[must_use]
    pub fn managed_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(script) = &self.script {
            files.push(script.clone());
        }
        if let Some(binary) = &self.binary {
            files.push(binary.clone());
        }
        files.push(self.path.clone());
        files
    }
}

/// Expand a leading `~/` against `home`; other values pass through.
#[must_use]
pub fn expand_home(value: &str, home: &Path) -> PathBuf {
    value
        .strip_prefix("~/")
        .map_or_else(|| PathBuf::from(value), |rest| home.join(rest))
}

/// Discover tool metadata files (`*.conf`) in `dir`.
///
/// Unparseable files are skipped with a warning; a missing directory
/// yields an empty set. The run never aborts over one bad tool.
#[must_use]
pub fn discover_tools(dir: &Path, home: &Path) -> Vec<ToolManifest> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "conf"))
        .collect();
    paths.sort();

    paths
        .iter()
        .filter_map(|path| match ToolManifest::parse(path, home) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                warn!("skipping tool metadata {}: {e}", path.display());
                None
            }
        })
        .collect()
}
