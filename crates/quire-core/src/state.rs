//! Sync state reported to clients after a cycle.

use serde::{Deserialize, Serialize};

/// Outcome of the last sync cycle as shown to users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// The remote could not be reached; nothing was merged.
    Offline,
    /// Local and remote agree as far as this device knows.
    Synced,
    /// Conflict copies exist and need manual reconciliation.
    Conflicts,
    /// Local changes are still waiting to be pushed.
    Pending,
}
