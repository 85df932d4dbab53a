//! Push and pull algorithms shared by every storage strategy.
//!
//! Merge decisions compare a pending local edit against the remote using
//! per-field metadata timestamps, never whole-item versions. A remote win
//! on a document or page keeps the local edit alive as a conflict copy.

mod pull;
mod push;
mod repair;


use crate::collection::Collection;
use crate::models::{LocalChange, RemoteInfo};
use crate::strategy::StorageStrategy;
use crate::{Error, Result};

pub use pull::pull;
pub use push::push;
pub use repair::repair_orphans;

/// Result of a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub remote_info: RemoteInfo,
    /// True when a snapshot was written.
    pub pushed: bool,
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullOutcome {
    /// New local content; `None` when nothing was pulled.
    pub content: Option<Collection>,
    pub remote_info: RemoteInfo,
    /// Changes the pull itself made that must be pushed later.
    pub recorded: Vec<LocalChange>,
    /// Conflict copies created plus orphans relocated.
    pub conflicts: usize,
}

impl PullOutcome {
    const fn unchanged(remote_info: RemoteInfo) -> Self {
        Self {
            content: None,
            remote_info,
            recorded: Vec::new(),
            conflicts: 0,
        }
    }
}

fn ensure_configured<S: StorageStrategy + ?Sized>(strategy: &S) -> Result<()> {
    if strategy.is_configured() {
        Ok(())
    } else {
        Err(Error::NotConfigured(strategy.driver_name().to_string()))
    }
}
