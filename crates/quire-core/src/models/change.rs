//! Local change log entries

use serde::{Deserialize, Serialize};

use super::{FieldName, ItemId};

/// What happened to an item since the last successful push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add,
    Update,
    Delete,
}

/// One entry of the local change log.
///
/// Fields are private so an `Update` always names the field it touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalChange {
    item: ItemId,
    change: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field: Option<FieldName>,
    updated: i64,
}

impl LocalChange {
    #[must_use]
    pub const fn add(item: ItemId, updated: i64) -> Self {
        Self {
            item,
            change: ChangeKind::Add,
            field: None,
            updated,
        }
    }

    #[must_use]
    pub const fn update(item: ItemId, field: FieldName, updated: i64) -> Self {
        Self {
            item,
            change: ChangeKind::Update,
            field: Some(field),
            updated,
        }
    }

    #[must_use]
    pub const fn delete(item: ItemId, updated: i64) -> Self {
        Self {
            item,
            change: ChangeKind::Delete,
            field: None,
            updated,
        }
    }

    #[must_use]
    pub const fn item(&self) -> &ItemId {
        &self.item
    }

    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        self.change
    }

    /// The touched field; always `Some` for updates.
    #[must_use]
    pub const fn field(&self) -> Option<FieldName> {
        self.field
    }

    #[must_use]
    pub const fn updated(&self) -> i64 {
        self.updated
    }

    pub(crate) fn touch(&mut self, updated: i64) {
        self.updated = updated;
    }
}
