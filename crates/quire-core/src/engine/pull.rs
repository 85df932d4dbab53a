use std::collections::HashSet;

use crate::collection::Collection;
use crate::models::{ChangeKind, ItemId, LocalChange, RemoteInfo};
use crate::strategy::StorageStrategy;
use crate::util::now_ms;
use crate::Result;

use super::{ensure_configured, repair_orphans, PullOutcome};

/// Bring remote changes into the local collection.
///
/// Pending local changes are resolved against the downloaded snapshot one by
/// one; when the remote side wins, the local version of a document or page
/// survives as a conflict copy. A forced pull adopts the remote as is.
pub async fn pull<S: StorageStrategy + ?Sized>(
    strategy: &S,
    content: &Collection,
    changes: &[LocalChange],
    cached: &RemoteInfo,
    force: bool,
) -> Result<PullOutcome> {
    ensure_configured(strategy)?;

    let head = strategy.fetch_head().await?;
    if !head.connected {
        tracing::info!(driver = strategy.driver_name(), "Remote offline, pull skipped");
        return Ok(PullOutcome::unchanged(cached.disconnected()));
    }

    let Some(info) = head.info.clone() else {
        tracing::debug!("Remote has no snapshot yet, nothing to pull");
        return Ok(PullOutcome::unchanged(head.merge_into(cached)));
    };
    if !force && cached.last_pulled >= head.last_remote_change {
        tracing::debug!(
            last_pulled = cached.last_pulled,
            last_remote_change = head.last_remote_change,
            "Remote unchanged since last pull"
        );
        return Ok(PullOutcome::unchanged(head.merge_into(cached)));
    }

    let snapshot = strategy.read_snapshot(&info).await?;
    let remote_stamp = snapshot.updated;
    let mut candidate = snapshot.into_collection();
    let mut recorded = Vec::new();
    let mut conflicts = 0;

    if !force {
        let now = now_ms();
        conflicts += resolve_changes(&mut candidate, content, changes, remote_stamp, now);
        let (repairs, relocated) = repair_orphans(&mut candidate, now);
        recorded = repairs;
        conflicts += relocated;
    }

    tracing::info!(
        driver = strategy.driver_name(),
        items = candidate.len(),
        conflicts,
        revision = head.last_remote_change,
        force,
        "Pulled snapshot"
    );

    Ok(PullOutcome {
        content: Some(candidate),
        remote_info: RemoteInfo {
            connected: true,
            last_remote_change: head.last_remote_change,
            last_pulled: head.last_remote_change,
            info: Some(info),
        },
        recorded,
        conflicts,
    })
}

/// Replay local changes onto the remote candidate. Returns the number of
/// conflict copies created.
///
/// Conflict copies never reach a remote, so the ones already held locally
/// are carried into the candidate first. A change the remote wins again on a
/// later pull does not get a second copy.
fn resolve_changes(
    candidate: &mut Collection,
    local: &Collection,
    changes: &[LocalChange],
    remote_stamp: i64,
    now: i64,
) -> usize {
    let carried: Vec<_> = local
        .iter()
        .filter(|item| item.is_conflict_copy() && !candidate.contains(item.id.as_str()))
        .cloned()
        .collect();
    for copy in carried {
        candidate.insert(copy);
    }

    let mut copied = HashSet::new();

    for change in changes {
        let id = change.item().as_str();
        let local_item = local.get(id);

        if change.kind() == ChangeKind::Add {
            if let Some(item) = local_item {
                candidate.insert(item.clone());
            }
            continue;
        }

        let remote_updated = remote_timestamp(candidate, change, remote_stamp);
        if change.updated() > remote_updated {
            tracing::debug!(item = id, kind = ?change.kind(), field = ?change.field(), "Local change wins");
            match change.kind() {
                ChangeKind::Update => {
                    let Some(item) = local_item else {
                        continue;
                    };
                    match (candidate.get_mut(id), change.field()) {
                        (Some(remote), Some(field)) => remote.copy_field_from(field, item),
                        _ => {
                            candidate.insert(item.clone());
                        }
                    }
                }
                ChangeKind::Delete => {
                    candidate.remove(id);
                }
                ChangeKind::Add => {}
            }
            continue;
        }

        tracing::debug!(item = id, remote_updated, local_updated = change.updated(), "Remote change wins");
        let Some(item) = local_item else {
            continue;
        };
        if item.is_conflict()
            || item.item_type.is_container()
            || has_copy_of(candidate, &item.id)
            || !copied.insert(item.id.clone())
        {
            continue;
        }
        let copy = item.conflict_copy(now);
        tracing::info!(item = id, copy = %copy.id, "Created conflict copy");
        candidate.insert(copy);
    }

    copied.len()
}

fn has_copy_of(candidate: &Collection, original: &ItemId) -> bool {
    candidate
        .iter()
        .any(|item| item.is_conflict_copy() && item.conflict.as_ref() == Some(original))
}

/// The remote side's timestamp a local change competes against.
fn remote_timestamp(candidate: &Collection, change: &LocalChange, remote_stamp: i64) -> i64 {
    match (candidate.get(change.item().as_str()), change.field()) {
        (Some(item), Some(field)) if change.kind() == ChangeKind::Update => {
            item.field_updated(field)
        }
        (Some(item), _) => item.updated,
        (None, _) => remote_stamp,
    }
}
