//! Collection item model

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Parent id of top-level items (notebooks).
pub const ROOT_ID: &str = "home";

/// Id of the notebook that receives relocated orphans.
pub const CONFLICTS_NOTEBOOK_ID: &str = "conflicts";

/// Title given to the conflicts notebook when it is created during a pull.
pub const CONFLICTS_NOTEBOOK_TITLE: &str = "Conflicts";

const PREVIEW_MAX_CHARS: usize = 80;

/// Opaque, stable identifier of a collection item.
///
/// Fresh ids are UUID v7 strings so they sort by creation time, but any
/// string is accepted since remote snapshots may come from other clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new unique item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The reserved root id.
    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    /// The reserved conflicts notebook id.
    #[must_use]
    pub fn conflicts() -> Self {
        Self(CONFLICTS_NOTEBOOK_ID.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of node in the collection tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[serde(rename = "n")]
    Notebook,
    #[serde(rename = "f")]
    Folder,
    #[serde(rename = "d")]
    Document,
    #[serde(rename = "p")]
    Page,
}

impl ItemType {
    /// Title used for newly created items of this type.
    #[must_use]
    pub const fn default_title(self) -> &'static str {
        match self {
            Self::Notebook => "New notebook",
            Self::Folder => "New folder",
            Self::Document => "New document",
            Self::Page => "",
        }
    }

    /// Structural containers never produce conflict copies.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Notebook | Self::Folder)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notebook => "notebook",
            Self::Folder => "folder",
            Self::Document => "document",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notebook" | "n" => Ok(Self::Notebook),
            "folder" | "f" => Ok(Self::Folder),
            "document" | "doc" | "d" => Ok(Self::Document),
            "page" | "p" => Ok(Self::Page),
            other => Err(Error::InvalidInput(format!("Unknown item type: {other}"))),
        }
    }
}

/// A field value paired with the time it was last changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracked<T> {
    pub value: T,
    /// Field metadata timestamp (Unix ms)
    pub updated: i64,
}

impl<T> Tracked<T> {
    pub const fn new(value: T, updated: i64) -> Self {
        Self { value, updated }
    }
}

/// Independently mergeable item fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Parent,
    Title,
    Content,
    Tags,
    Order,
    Deleted,
}

impl FieldName {
    pub const ALL: [Self; 6] = [
        Self::Parent,
        Self::Title,
        Self::Content,
        Self::Tags,
        Self::Order,
        Self::Deleted,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Title => "title",
            Self::Content => "content",
            Self::Tags => "tags",
            Self::Order => "order",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidInput(format!("Unknown field: {s}")))
    }
}

/// New value for a field update coming from the editing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Number(i64),
    Flag(bool),
}

/// A node of the collection tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub id: ItemId,
    pub parent: Tracked<ItemId>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: Tracked<String>,
    /// Rich-text payload, opaque to the sync engine
    pub content: Tracked<String>,
    /// Cached short text derived from `content`
    #[serde(default)]
    pub preview: String,
    /// Comma-delimited tag list
    pub tags: Tracked<String>,
    pub order: Tracked<i64>,
    /// Soft delete flag, reserved
    pub deleted: Tracked<bool>,
    /// Creation timestamp (Unix ms)
    pub created: i64,
    /// Last update timestamp (Unix ms)
    pub updated: i64,
    /// Id of the item this one is a conflict copy of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ItemId>,
}

impl CollectionItem {
    /// Create a new item; every field's metadata starts at `at`.
    #[must_use]
    pub fn new(item_type: ItemType, parent: ItemId, title: impl Into<String>, at: i64) -> Self {
        Self {
            id: ItemId::new(),
            parent: Tracked::new(parent, at),
            item_type,
            title: Tracked::new(title.into(), at),
            content: Tracked::new(String::new(), at),
            preview: String::new(),
            tags: Tracked::new(String::new(), at),
            order: Tracked::new(0, at),
            deleted: Tracked::new(false, at),
            created: at,
            updated: at,
            conflict: None,
        }
    }

    /// Builder-style id override, mostly for fixed ids and tests.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = id.into();
        self
    }

    /// The empty notebook that collects relocated orphans.
    #[must_use]
    pub fn conflicts_notebook(at: i64) -> Self {
        Self::new(
            ItemType::Notebook,
            ItemId::root(),
            CONFLICTS_NOTEBOOK_TITLE,
            at,
        )
        .with_id(ItemId::conflicts())
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        self.conflict.is_some()
    }

    /// A local copy kept after the remote won, as opposed to an item
    /// relocated into the conflicts notebook.
    #[must_use]
    pub fn is_conflict_copy(&self) -> bool {
        self.conflict
            .as_ref()
            .is_some_and(|original| *original != self.id)
    }

    /// Metadata timestamp of one field.
    #[must_use]
    pub const fn field_updated(&self, field: FieldName) -> i64 {
        match field {
            FieldName::Parent => self.parent.updated,
            FieldName::Title => self.title.updated,
            FieldName::Content => self.content.updated,
            FieldName::Tags => self.tags.updated,
            FieldName::Order => self.order.updated,
            FieldName::Deleted => self.deleted.updated,
        }
    }

    /// Copy one field and its metadata from `other`.
    ///
    /// `content` carries its derived `preview` along.
    pub fn copy_field_from(&mut self, field: FieldName, other: &Self) {
        match field {
            FieldName::Parent => self.parent = other.parent.clone(),
            FieldName::Title => self.title = other.title.clone(),
            FieldName::Content => {
                self.content = other.content.clone();
                self.preview = other.preview.clone();
            }
            FieldName::Tags => self.tags = other.tags.clone(),
            FieldName::Order => self.order = other.order.clone(),
            FieldName::Deleted => self.deleted = other.deleted.clone(),
        }
    }

    /// Write a field value and its metadata.
    ///
    /// Returns `Ok(false)` when the value is unchanged. Moving a non-page item
    /// does not count as an update of the item itself.
    pub fn set_field(&mut self, field: FieldName, value: FieldValue, at: i64) -> Result<bool> {
        let changed = match (field, value) {
            (FieldName::Parent, FieldValue::Text(value)) => {
                update_tracked(&mut self.parent, ItemId::from(value), at)
            }
            (FieldName::Title, FieldValue::Text(value)) => update_tracked(&mut self.title, value, at),
            (FieldName::Content, FieldValue::Text(value)) => {
                let changed = update_tracked(&mut self.content, value, at);
                if changed {
                    self.preview = preview_of(&self.content.value);
                }
                changed
            }
            (FieldName::Tags, FieldValue::Text(value)) => {
                update_tracked(&mut self.tags, normalize_tags(&value), at)
            }
            (FieldName::Order, FieldValue::Number(value)) => update_tracked(&mut self.order, value, at),
            (FieldName::Deleted, FieldValue::Flag(value)) => {
                update_tracked(&mut self.deleted, value, at)
            }
            (field, value) => {
                return Err(Error::InvalidInput(format!(
                    "Value {value:?} does not fit field '{field}'"
                )));
            }
        };

        if changed && (field != FieldName::Parent || self.item_type == ItemType::Page) {
            self.updated = at;
        }
        Ok(changed)
    }

    /// Clone this item as a conflict copy pointing back at it.
    #[must_use]
    pub fn conflict_copy(&self, at: i64) -> Self {
        Self {
            id: ItemId::new(),
            conflict: Some(self.id.clone()),
            created: at,
            updated: at,
            ..self.clone()
        }
    }

    /// Tags as a list, in stored order.
    #[must_use]
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .value
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    }
}

fn update_tracked<T: PartialEq>(tracked: &mut Tracked<T>, value: T, at: i64) -> bool {
    if tracked.value == value {
        return false;
    }
    tracked.value = value;
    tracked.updated = at;
    true
}

fn normalize_tags(raw: &str) -> String {
    let mut tags: Vec<&str> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags.join(",")
}

/// First non-empty line of `content`, truncated.
#[must_use]
pub fn preview_of(content: &str) -> String {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .chars()
        .take(PREVIEW_MAX_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn document(at: i64) -> CollectionItem {
        CollectionItem::new(ItemType::Document, ItemId::from("nb"), "doc", at)
    }

    #[test]
    fn test_item_id_unique() {
        assert_ne!(ItemId::new(), ItemId::new());
        assert!(ItemId::root().is_root());
    }

    #[test]
    fn test_item_type_parse() {
        assert_eq!("folder".parse::<ItemType>().unwrap(), ItemType::Folder);
        assert_eq!("Doc".parse::<ItemType>().unwrap(), ItemType::Document);
        assert!("shelf".parse::<ItemType>().is_err());
    }

    #[test]
    fn test_new_item_stamps_every_field() {
        let item = document(10);
        for field in FieldName::ALL {
            assert_eq!(item.field_updated(field), 10);
        }
        assert_eq!(item.created, 10);
        assert!(!item.is_conflict());
    }

    #[test]
    fn set_field_updates_value_meta_and_item() {
        let mut item = document(10);
        assert!(item
            .set_field(FieldName::Title, FieldValue::Text("renamed".into()), 20)
            .unwrap());
        assert_eq!(item.title, Tracked::new("renamed".to_string(), 20));
        assert_eq!(item.updated, 20);
        assert_eq!(item.field_updated(FieldName::Content), 10);
    }

    #[test]
    fn set_field_same_value_is_noop() {
        let mut item = document(10);
        assert!(!item
            .set_field(FieldName::Title, FieldValue::Text("doc".into()), 20)
            .unwrap());
        assert_eq!(item.title.updated, 10);
        assert_eq!(item.updated, 10);
    }

    #[test]
    fn set_field_rejects_mismatched_value() {
        let mut item = document(10);
        let err = item
            .set_field(FieldName::Order, FieldValue::Text("3".into()), 20)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn moving_a_document_keeps_item_updated() {
        let mut item = document(10);
        item.set_field(FieldName::Parent, FieldValue::Text("other".into()), 30)
            .unwrap();
        assert_eq!(item.parent.updated, 30);
        assert_eq!(item.updated, 10);

        let mut page = CollectionItem::new(ItemType::Page, ItemId::from("doc"), "", 10);
        page.set_field(FieldName::Parent, FieldValue::Text("doc2".into()), 30)
            .unwrap();
        assert_eq!(page.updated, 30);
    }

    #[test]
    fn content_update_refreshes_preview() {
        let mut item = document(10);
        item.set_field(
            FieldName::Content,
            FieldValue::Text("\n  First line  \nsecond".into()),
            20,
        )
        .unwrap();
        assert_eq!(item.preview, "First line");
    }

    #[test]
    fn copy_content_carries_preview() {
        let mut source = document(10);
        source
            .set_field(FieldName::Content, FieldValue::Text("hello".into()), 50)
            .unwrap();
        let mut target = document(10);
        target.copy_field_from(FieldName::Content, &source);
        assert_eq!(target.content, Tracked::new("hello".to_string(), 50));
        assert_eq!(target.preview, "hello");
    }

    #[test]
    fn tags_are_normalized() {
        let mut item = document(10);
        item.set_field(FieldName::Tags, FieldValue::Text(" a, b ,,a,c".into()), 20)
            .unwrap();
        assert_eq!(item.tags.value, "a,b,c");
        assert_eq!(item.tag_list(), vec!["a", "b", "c"]);
    }

    #[test]
    fn copy_field_from_carries_order_and_deleted() {
        let mut target = document(10);
        let mut source = document(10);
        source
            .set_field(FieldName::Order, FieldValue::Number(7), 40)
            .unwrap();
        source
            .set_field(FieldName::Deleted, FieldValue::Flag(true), 50)
            .unwrap();

        target.copy_field_from(FieldName::Order, &source);
        target.copy_field_from(FieldName::Deleted, &source);

        assert_eq!(target.order, Tracked::new(7, 40));
        assert_eq!(target.deleted, Tracked::new(true, 50));
        assert_eq!(source.order.value, 7);
    }

    #[test]
    fn relocated_orphan_is_not_a_conflict_copy() {
        let mut item = document(10);
        assert!(!item.is_conflict_copy());
        item.conflict = Some(item.id.clone());
        assert!(item.is_conflict());
        assert!(!item.is_conflict_copy());
        assert!(item.conflict_copy(20).is_conflict_copy());
    }

    #[test]
    fn conflict_copy_points_at_original() {
        let item = document(10);
        let copy = item.conflict_copy(99);
        assert_ne!(copy.id, item.id);
        assert_eq!(copy.conflict.as_ref(), Some(&item.id));
        assert_eq!(copy.created, 99);
        assert_eq!(copy.title, item.title);
    }
}
