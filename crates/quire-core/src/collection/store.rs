//! Ordered in-memory item table

use indexmap::IndexMap;

use crate::models::{CollectionItem, ItemId, ROOT_ID};

/// Items keyed by id in insertion order.
///
/// Order matters: snapshots are written in this order, and a pull keeps the
/// remote order with local additions appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    items: IndexMap<ItemId, CollectionItem>,
}

impl Collection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from items; a later duplicate id replaces the earlier one in place.
    pub fn from_items(items: impl IntoIterator<Item = CollectionItem>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.insert(item);
        }
        collection
    }

    /// Full ordered snapshot.
    #[must_use]
    pub fn items(&self) -> Vec<CollectionItem> {
        self.items.values().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionItem> {
        self.items.values()
    }

    /// Swap the whole content for `other`.
    pub fn replace(&mut self, other: Self) {
        self.items = other.items;
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CollectionItem> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CollectionItem> {
        self.items.get_mut(id)
    }

    /// Append a new item, or replace an existing one keeping its position.
    pub fn insert(&mut self, item: CollectionItem) -> Option<CollectionItem> {
        self.items.insert(item.id.clone(), item)
    }

    /// Remove an item, preserving the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<CollectionItem> {
        self.items.shift_remove(id)
    }

    /// Keep only items matching `keep`, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&CollectionItem) -> bool) {
        self.items.retain(|_, item| keep(item));
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of conflict copies and relocated orphans.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.iter().filter(|item| item.is_conflict()).count()
    }

    #[must_use]
    pub fn children_of(&self, parent: &str) -> Vec<&CollectionItem> {
        self.iter()
            .filter(|item| item.parent.value.as_str() == parent)
            .collect()
    }

    /// True when `id` is the root or an item of this collection.
    #[must_use]
    pub fn resolves(&self, id: &str) -> bool {
        id == ROOT_ID || self.contains(id)
    }
}

impl FromIterator<CollectionItem> for Collection {
    fn from_iter<T: IntoIterator<Item = CollectionItem>>(iter: T) -> Self {
        Self::from_items(iter)
    }
}
