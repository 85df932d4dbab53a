//! Ordered log of local edits since the last successful push

use crate::models::{ChangeKind, LocalChange};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLog {
    entries: Vec<LocalChange>,
}

impl ChangeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change, folding it into pending entries for the same item.
    ///
    /// Updates to an item with a pending `Add` only bump the `Add`. A delete
    /// cancels everything pending for the item, and cancels itself too when
    /// the item was never pushed.
    pub fn record(&mut self, change: LocalChange) {
        match change.kind() {
            ChangeKind::Add => self.entries.push(change),
            ChangeKind::Update => {
                let pending = self
                    .entries
                    .iter()
                    .position(|entry| {
                        entry.item() == change.item() && entry.kind() == ChangeKind::Add
                    })
                    .or_else(|| {
                        self.entries.iter().position(|entry| {
                            entry.item() == change.item()
                                && entry.kind() == ChangeKind::Update
                                && entry.field() == change.field()
                        })
                    });
                match pending {
                    Some(index) => self.entries[index].touch(change.updated()),
                    None => self.entries.push(change),
                }
            }
            ChangeKind::Delete => {
                let before = self.entries.len();
                let mut was_added = false;
                self.entries.retain(|entry| {
                    if entry.item() != change.item() {
                        return true;
                    }
                    was_added |= entry.kind() == ChangeKind::Add;
                    false
                });
                if was_added {
                    tracing::debug!(
                        item = %change.item(),
                        dropped = before - self.entries.len(),
                        "Deleted item was never pushed, dropping its changes"
                    );
                    return;
                }
                self.entries.push(change);
            }
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[LocalChange] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl From<Vec<LocalChange>> for ChangeLog {
    fn from(entries: Vec<LocalChange>) -> Self {
        Self { entries }
    }
}
