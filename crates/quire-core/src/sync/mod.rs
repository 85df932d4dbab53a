//! Sync service: runs push/pull cycles for a workspace against its remotes.
//!
//! The first remote is the primary. Pulls only ever read from one remote per
//! cycle; pushes go to every connected remote unless one is named.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::collection::Workspace;
use crate::models::RemoteInfo;
use crate::state::SyncState;
use crate::strategy::StorageStrategy;
use crate::{Error, Result};

/// What a sync cycle should do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
    /// Pull from the primary, then push if local changes remain and no
    /// conflicts need attention.
    #[default]
    Sync,
    Push,
    Pull,
    ForcePush,
    ForcePull,
}

impl SyncDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Push => "push",
            Self::Pull => "pull",
            Self::ForcePush => "force-push",
            Self::ForcePull => "force-pull",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "push" => Ok(Self::Push),
            "pull" => Ok(Self::Pull),
            "force-push" | "force_push" => Ok(Self::ForcePush),
            "force-pull" | "force_pull" => Ok(Self::ForcePull),
            other => Err(Error::InvalidInput(format!("Unknown sync direction: {other}"))),
        }
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub state: SyncState,
    /// New content was merged into the workspace.
    pub pulled: bool,
    /// At least one snapshot was written.
    pub pushed: bool,
    /// Conflict items now in the workspace.
    pub conflicts: usize,
    pub connected: bool,
}

impl SyncReport {
    fn new(direction: SyncDirection, workspace: &Workspace, connected: bool) -> Self {
        let conflicts = workspace.conflict_count();
        let state = if !connected {
            SyncState::Offline
        } else if conflicts > 0 {
            SyncState::Conflicts
        } else if workspace.has_local_changes() {
            SyncState::Pending
        } else {
            SyncState::Synced
        };
        Self {
            direction,
            state,
            pulled: false,
            pushed: false,
            conflicts,
            connected,
        }
    }
}

/// A configured remote with the device's cached view of it.
#[derive(Debug, Clone)]
pub struct Remote<S> {
    pub name: String,
    pub strategy: S,
    pub info: RemoteInfo,
}

#[derive(Debug, Clone)]
pub struct SyncService<S> {
    remotes: Vec<Remote<S>>,
}

impl<S> Default for SyncService<S> {
    fn default() -> Self {
        Self {
            remotes: Vec::new(),
        }
    }
}

impl<S: StorageStrategy> SyncService<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a remote; the first one added is the primary.
    pub fn add_remote(&mut self, name: impl Into<String>, strategy: S, info: RemoteInfo) -> Result<()> {
        let name = name.into();
        if self.remotes.iter().any(|remote| remote.name == name) {
            return Err(Error::InvalidInput(format!("Remote '{name}' already exists")));
        }
        self.remotes.push(Remote {
            name,
            strategy,
            info,
        });
        Ok(())
    }

    #[must_use]
    pub fn remotes(&self) -> &[Remote<S>] {
        &self.remotes
    }

    #[must_use]
    pub fn primary(&self) -> Option<&Remote<S>> {
        self.remotes.first()
    }

    /// Cached info for every remote, keyed by name, for persistence.
    #[must_use]
    pub fn remote_infos(&self) -> BTreeMap<String, RemoteInfo> {
        self.remotes
            .iter()
            .map(|remote| (remote.name.clone(), remote.info.clone()))
            .collect()
    }

    #[must_use]
    pub fn primary_connected(&self) -> bool {
        self.primary().is_some_and(|remote| remote.info.connected)
    }

    /// Local edits are waiting and there is somewhere to push them.
    #[must_use]
    pub fn has_pending_push(&self, workspace: &Workspace) -> bool {
        self.primary().is_some() && workspace.has_local_changes()
    }

    /// Probe every remote, writing version markers where missing.
    pub async fn connect_all(&mut self) -> Result<()> {
        for remote in &mut self.remotes {
            let head = remote.strategy.connect().await?;
            remote.info = head.merge_into(&remote.info);
            tracing::info!(
                remote = %remote.name,
                driver = remote.strategy.driver_name(),
                connected = remote.info.connected,
                "Connected remote"
            );
        }
        Ok(())
    }

    pub async fn run(
        &mut self,
        workspace: &mut Workspace,
        direction: SyncDirection,
        remote: Option<&str>,
    ) -> Result<SyncReport> {
        let mut report = match direction {
            SyncDirection::Sync => self.sync(workspace).await?,
            SyncDirection::Push => self.push(workspace, remote, false).await?,
            SyncDirection::Pull => self.pull(workspace, remote, false).await?,
            SyncDirection::ForcePush => self.push(workspace, remote, true).await?,
            SyncDirection::ForcePull => self.pull(workspace, remote, true).await?,
        };
        report.direction = direction;
        Ok(report)
    }

    /// Pull from the named remote, else the primary.
    pub async fn pull(
        &mut self,
        workspace: &mut Workspace,
        remote: Option<&str>,
        force: bool,
    ) -> Result<SyncReport> {
        let index = self.pull_index(remote)?;
        let target = &mut self.remotes[index];

        let outcome = target
            .strategy
            .pull(
                workspace.collection(),
                workspace.changes().entries(),
                &target.info,
                force,
            )
            .await?;
        target.info = outcome.remote_info;

        let pulled = outcome.content.is_some();
        if let Some(content) = outcome.content {
            workspace.replace_collection(content);
            if force {
                // Local edits were discarded along with the local content.
                workspace.clear_changes();
            }
            for change in outcome.recorded {
                workspace.record(change);
            }
        }

        let direction = if force {
            SyncDirection::ForcePull
        } else {
            SyncDirection::Pull
        };
        let mut report = SyncReport::new(direction, workspace, target.info.connected);
        report.pulled = pulled;
        Ok(report)
    }

    /// Push to the named remote, else to every connected remote. The change
    /// log is cleared once every push has committed.
    pub async fn push(
        &mut self,
        workspace: &mut Workspace,
        remote: Option<&str>,
        force: bool,
    ) -> Result<SyncReport> {
        if let Some(name) = remote {
            if !self.remotes.iter().any(|candidate| candidate.name == name) {
                return Err(Error::NotFound(format!("remote '{name}'")));
            }
        }

        let content = workspace.collection().clone();
        let changes = workspace.changes().entries().to_vec();
        let mut pushed = false;
        let mut connected = false;

        for target in self
            .remotes
            .iter_mut()
            .filter(|candidate| remote.map_or(true, |name| candidate.name == name))
            .filter(|candidate| candidate.info.connected)
        {
            let outcome = target
                .strategy
                .push(&content, &changes, &target.info, force)
                .await?;
            target.info = outcome.remote_info;
            pushed |= outcome.pushed;
            connected |= target.info.connected;
        }

        if pushed {
            workspace.clear_changes();
        }

        let direction = if force {
            SyncDirection::ForcePush
        } else {
            SyncDirection::Push
        };
        let mut report = SyncReport::new(direction, workspace, connected);
        report.pushed = pushed;
        Ok(report)
    }

    /// Pull from the primary, then push when local changes remain and no
    /// conflicts are waiting.
    pub async fn sync(&mut self, workspace: &mut Workspace) -> Result<SyncReport> {
        let pulled = self.pull(workspace, None, false).await?;
        if !pulled.connected || !workspace.has_local_changes() || workspace.conflict_count() > 0 {
            return Ok(SyncReport {
                direction: SyncDirection::Sync,
                ..pulled
            });
        }

        let pushed = self.push(workspace, None, false).await?;
        Ok(SyncReport {
            direction: SyncDirection::Sync,
            pulled: pulled.pulled,
            ..pushed
        })
    }

    fn pull_index(&self, remote: Option<&str>) -> Result<usize> {
        match remote {
            Some(name) => self
                .remotes
                .iter()
                .position(|candidate| candidate.name == name)
                .ok_or_else(|| Error::NotFound(format!("remote '{name}'"))),
            None if self.remotes.is_empty() => Err(Error::InvalidInput(
                "No remote configured".to_string(),
            )),
            None => Ok(0),
        }
    }
}
