//! Remote blob descriptors and cached per-remote sync state

use serde::{Deserialize, Serialize};

/// Descriptor of one blob revision on a remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverFileInfo {
    /// Provider-specific handle (object key, URL, path)
    pub providerid: String,
    pub filename: String,
    /// Revision timestamp (Unix ms)
    pub updated: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Result of probing a remote for a set of file names.
///
/// Absent files are simply missing from `files`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesInfo {
    pub connected: bool,
    pub files: Vec<DriverFileInfo>,
}

impl FilesInfo {
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            connected: false,
            files: Vec::new(),
        }
    }

    #[must_use]
    pub fn find(&self, filename: &str) -> Option<&DriverFileInfo> {
        self.files.iter().find(|file| file.filename == filename)
    }
}

/// What this device knows about one remote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInfo {
    #[serde(default)]
    pub connected: bool,
    /// Revision of the remote snapshot as last observed (Unix ms)
    #[serde(default)]
    pub last_remote_change: i64,
    /// Remote revision this device last merged
    #[serde(default)]
    pub last_pulled: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<DriverFileInfo>,
}

impl RemoteInfo {
    /// Copy with `connected` cleared, everything else kept.
    #[must_use]
    pub fn disconnected(&self) -> Self {
        Self {
            connected: false,
            ..self.clone()
        }
    }

    /// True when the remote has a revision this device has not merged.
    #[must_use]
    pub const fn has_unpulled_change(&self) -> bool {
        self.info.is_some() && self.last_remote_change > self.last_pulled
    }
}
