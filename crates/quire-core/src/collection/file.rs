//! On-disk form of a device's local state

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::{CollectionItem, LocalChange, RemoteInfo};
use crate::Result;

use super::{ChangeLog, Collection, Workspace};

pub const WORKSPACE_FILE_NAME: &str = "workspace.json";

/// Items, pending changes, and per-remote cursors, persisted together so a
/// sync can resume where the last one stopped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceFile {
    #[serde(default = "default_file_version")]
    pub version: u32,
    #[serde(default)]
    pub items: Vec<CollectionItem>,
    #[serde(default)]
    pub changes: Vec<LocalChange>,
    #[serde(default)]
    pub remotes: BTreeMap<String, RemoteInfo>,
}

const fn default_file_version() -> u32 {
    1
}

impl WorkspaceFile {
    /// Load from `path`; a missing file is an empty workspace.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                version: default_file_version(),
                ..Self::default()
            });
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    #[must_use]
    pub fn capture(workspace: &Workspace, remotes: BTreeMap<String, RemoteInfo>) -> Self {
        Self {
            version: default_file_version(),
            items: workspace.collection().items(),
            changes: workspace.changes().entries().to_vec(),
            remotes,
        }
    }

    #[must_use]
    pub fn into_workspace(self) -> (Workspace, BTreeMap<String, RemoteInfo>) {
        let workspace = Workspace::from_parts(
            Collection::from_items(self.items),
            ChangeLog::from(self.changes),
        );
        (workspace, self.remotes)
    }
}
