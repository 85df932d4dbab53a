//! Snapshot codec: the whole collection as one JSON blob.
//!
//! Items are written with short keys to keep snapshots small:
//!
//! | key | field | key | field meta |
//! |-----|-------|-----|------------|
//! | `i` | id | | |
//! | `p` | parent | `P` | parent |
//! | `ty` | type | | |
//! | `t` | title | `T` | title |
//! | `c` | content | `C` | content |
//! | `pw` | preview | | |
//! | `ta` | tags | `TA` | tags |
//! | `o` | order | `O` | order |
//! | `d` | deleted | `D` | deleted |
//! | `cr` | created | `u` | updated |
//! | `cf` | conflict | | |

use serde::{Deserialize, Serialize};

use crate::collection::Collection;
use crate::models::{CollectionItem, ItemId, ItemType, Tracked, ROOT_ID};
use crate::Result;

/// Version written to the `v` key of every snapshot.
pub const MODEL_VERSION: u32 = 1;

/// A decoded snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub items: Vec<CollectionItem>,
    /// Timestamp the writer stamped on the snapshot (Unix ms)
    pub updated: i64,
    pub version: u32,
}

impl Snapshot {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            updated: 0,
            version: MODEL_VERSION,
        }
    }

    #[must_use]
    pub fn into_collection(self) -> Collection {
        Collection::from_items(self.items)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSnapshot {
    #[serde(rename = "i", default)]
    items: Vec<StoredItem>,
    #[serde(rename = "u", default)]
    updated: i64,
    #[serde(rename = "v", default)]
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct StoredItem {
    #[serde(rename = "i")]
    id: ItemId,
    #[serde(rename = "p", default = "ItemId::root")]
    parent: ItemId,
    #[serde(rename = "P", default)]
    parent_meta: i64,
    #[serde(rename = "ty", default = "default_item_type")]
    item_type: ItemType,
    #[serde(rename = "t", default)]
    title: String,
    #[serde(rename = "T", default)]
    title_meta: i64,
    #[serde(rename = "c", default)]
    content: String,
    #[serde(rename = "C", default)]
    content_meta: i64,
    #[serde(rename = "pw", default)]
    preview: String,
    #[serde(rename = "ta", default)]
    tags: String,
    #[serde(rename = "TA", default)]
    tags_meta: i64,
    #[serde(rename = "o", default)]
    order: i64,
    #[serde(rename = "O", default)]
    order_meta: i64,
    #[serde(rename = "d", default)]
    deleted: bool,
    #[serde(rename = "D", default)]
    deleted_meta: i64,
    #[serde(rename = "cr", default)]
    created: i64,
    #[serde(rename = "u", default)]
    updated: i64,
    #[serde(rename = "cf", default, skip_serializing_if = "Option::is_none")]
    conflict: Option<ItemId>,
}

const fn default_item_type() -> ItemType {
    ItemType::Document
}

impl From<&CollectionItem> for StoredItem {
    fn from(item: &CollectionItem) -> Self {
        Self {
            id: item.id.clone(),
            parent: item.parent.value.clone(),
            parent_meta: item.parent.updated,
            item_type: item.item_type,
            title: item.title.value.clone(),
            title_meta: item.title.updated,
            content: item.content.value.clone(),
            content_meta: item.content.updated,
            preview: item.preview.clone(),
            tags: item.tags.value.clone(),
            tags_meta: item.tags.updated,
            order: item.order.value,
            order_meta: item.order.updated,
            deleted: item.deleted.value,
            deleted_meta: item.deleted.updated,
            created: item.created,
            updated: item.updated,
            conflict: item.conflict.clone(),
        }
    }
}

impl From<StoredItem> for CollectionItem {
    fn from(stored: StoredItem) -> Self {
        Self {
            id: stored.id,
            parent: Tracked::new(stored.parent, stored.parent_meta),
            item_type: stored.item_type,
            title: Tracked::new(stored.title, stored.title_meta),
            content: Tracked::new(stored.content, stored.content_meta),
            preview: stored.preview,
            tags: Tracked::new(stored.tags, stored.tags_meta),
            order: Tracked::new(stored.order, stored.order_meta),
            deleted: Tracked::new(stored.deleted, stored.deleted_meta),
            created: stored.created,
            updated: stored.updated,
            conflict: stored.conflict.filter(|id| !id.as_str().is_empty()),
        }
    }
}

/// Encode items into a snapshot stamped with `updated`.
pub fn serialize(items: &[CollectionItem], updated: i64) -> Result<String> {
    let snapshot = StoredSnapshot {
        items: items.iter().map(StoredItem::from).collect(),
        updated,
        version: MODEL_VERSION,
    };
    Ok(serde_json::to_string(&snapshot)?)
}

/// Encoded size of a single item, used to pack shards.
pub fn encoded_len(item: &CollectionItem) -> Result<usize> {
    Ok(serde_json::to_string(&StoredItem::from(item))?.len())
}

/// Decode a snapshot. An empty blob is an empty snapshot.
///
/// Snapshots written by a different model version are still decoded; missing
/// keys fall back to defaults.
pub fn deserialize(blob: &str) -> Result<Snapshot> {
    if blob.trim().is_empty() {
        return Ok(Snapshot::empty());
    }

    let stored: StoredSnapshot = serde_json::from_str(blob)?;
    if stored.version != MODEL_VERSION {
        tracing::warn!(
            found = stored.version,
            expected = MODEL_VERSION,
            "Remote snapshot model version differs, decoding anyway"
        );
    }

    Ok(Snapshot {
        items: stored.items.into_iter().map(CollectionItem::from).collect(),
        updated: stored.updated,
        version: stored.version,
    })
}
