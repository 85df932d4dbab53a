use crate::collection::Collection;
use crate::models::{ChangeKind, LocalChange, RemoteInfo};
use crate::strategy::StorageStrategy;
use crate::Result;

use super::{ensure_configured, PushOutcome};

/// Write local changes to the remote.
///
/// The base is the local collection when the remote has nothing new for us
/// (or when forced); otherwise the current remote snapshot is downloaded and
/// local changes are replayed on top of it, local side winning.
pub async fn push<S: StorageStrategy + ?Sized>(
    strategy: &S,
    content: &Collection,
    changes: &[LocalChange],
    cached: &RemoteInfo,
    force: bool,
) -> Result<PushOutcome> {
    ensure_configured(strategy)?;

    let head = strategy.fetch_head().await?;
    if !head.connected {
        tracing::info!(driver = strategy.driver_name(), "Remote offline, push skipped");
        return Ok(PushOutcome {
            remote_info: cached.disconnected(),
            pushed: false,
        });
    }

    let new_last_remote_change = head.last_remote_change;
    let base_is_local = match &head.info {
        None => true,
        Some(_) if force => true,
        Some(_) => cached.last_pulled >= new_last_remote_change,
    };

    let mut base = match &head.info {
        Some(info) if !base_is_local => {
            tracing::debug!(
                last_pulled = cached.last_pulled,
                new_last_remote_change,
                "Remote moved since last pull, pushing on top of it"
            );
            strategy.read_snapshot(info).await?.into_collection()
        }
        _ => content.clone(),
    };
    base.retain(|item| !item.is_conflict());

    for change in changes {
        let id = change.item().as_str();
        match change.kind() {
            ChangeKind::Add | ChangeKind::Update => {
                let Some(local) = content.get(id) else {
                    continue;
                };
                if !base.contains(id) || change.kind() == ChangeKind::Update {
                    base.insert(local.clone());
                }
            }
            ChangeKind::Delete => {
                base.remove(id);
            }
        }
    }

    if changes.is_empty() && !force {
        return Ok(PushOutcome {
            remote_info: head.merge_into(cached),
            pushed: false,
        });
    }

    let updated = changes
        .iter()
        .map(LocalChange::updated)
        .max()
        .unwrap_or(new_last_remote_change);
    let info = strategy.write_snapshot(&base.items(), updated).await?;
    tracing::info!(
        driver = strategy.driver_name(),
        items = base.len(),
        changes = changes.len(),
        revision = info.updated,
        "Pushed snapshot"
    );

    Ok(PushOutcome {
        remote_info: RemoteInfo {
            connected: true,
            last_remote_change: info.updated,
            last_pulled: if base_is_local {
                info.updated
            } else {
                cached.last_pulled
            },
            info: Some(info),
        },
        pushed: true,
    })
}
