//! Editing layer: every mutation of the collection is mirrored in the change
//! log so the next sync can reconcile it.

use crate::models::{
    CollectionItem, FieldName, FieldValue, ItemId, ItemType, LocalChange, ROOT_ID,
};
use crate::util::now_ms;
use crate::{Error, Result};

use super::{ChangeLog, Collection};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    collection: Collection,
    changes: ChangeLog,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn from_parts(collection: Collection, changes: ChangeLog) -> Self {
        Self {
            collection,
            changes,
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (Collection, ChangeLog) {
        (self.collection, self.changes)
    }

    #[must_use]
    pub const fn collection(&self) -> &Collection {
        &self.collection
    }

    #[must_use]
    pub const fn changes(&self) -> &ChangeLog {
        &self.changes
    }

    #[must_use]
    pub fn has_local_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.collection.conflict_count()
    }

    /// Conflict copies and relocated orphans, in collection order.
    #[must_use]
    pub fn conflicts(&self) -> Vec<&CollectionItem> {
        self.collection
            .iter()
            .filter(|item| item.is_conflict())
            .collect()
    }

    /// Create an item under `parent` (root when `None`).
    pub fn add_item(
        &mut self,
        item_type: ItemType,
        parent: Option<&str>,
        title: Option<&str>,
    ) -> Result<ItemId> {
        self.add_item_at(item_type, parent, title, now_ms())
    }

    pub fn add_item_at(
        &mut self,
        item_type: ItemType,
        parent: Option<&str>,
        title: Option<&str>,
        at: i64,
    ) -> Result<ItemId> {
        let parent = parent.unwrap_or(ROOT_ID);
        self.check_placement(item_type, parent)?;

        let title = title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| item_type.default_title());
        let mut item = CollectionItem::new(item_type, ItemId::from(parent), title, at);
        item.order.value = i64::try_from(self.collection.children_of(parent).len())
            .unwrap_or(i64::MAX);

        let id = item.id.clone();
        tracing::debug!(item = %id, kind = %item_type, parent, "Adding item");
        self.collection.insert(item);
        self.changes.record(LocalChange::add(id.clone(), at));
        Ok(id)
    }

    /// Write one field. Returns `false` when the value was already current.
    ///
    /// Editing a conflict copy turns it into a regular item, which is then
    /// pushed as an addition.
    pub fn set_field(&mut self, id: &str, field: FieldName, value: FieldValue) -> Result<bool> {
        self.set_field_at(id, field, value, now_ms())
    }

    pub fn set_field_at(
        &mut self,
        id: &str,
        field: FieldName,
        value: FieldValue,
        at: i64,
    ) -> Result<bool> {
        if field == FieldName::Parent {
            if let FieldValue::Text(target) = &value {
                self.check_move(id, target)?;
            }
        }

        let item = self
            .collection
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        if !item.set_field(field, value, at)? {
            return Ok(false);
        }

        let change = if item.conflict.take().is_some() {
            LocalChange::add(item.id.clone(), at)
        } else {
            LocalChange::update(item.id.clone(), field, at)
        };
        self.changes.record(change);
        Ok(true)
    }

    /// Delete an item with everything below it. Returns the removed ids,
    /// children first.
    pub fn delete_item(&mut self, id: &str) -> Result<Vec<ItemId>> {
        self.delete_item_at(id, now_ms())
    }

    pub fn delete_item_at(&mut self, id: &str, at: i64) -> Result<Vec<ItemId>> {
        if !self.collection.contains(id) {
            return Err(Error::NotFound(id.to_string()));
        }

        let mut doomed = Vec::new();
        self.collect_subtree(id, &mut doomed);
        for item in &doomed {
            self.collection.remove(item.as_str());
            self.changes.record(LocalChange::delete(item.clone(), at));
        }
        tracing::debug!(item = id, removed = doomed.len(), "Deleted item");
        Ok(doomed)
    }

    /// Adopt pulled content.
    pub fn replace_collection(&mut self, collection: Collection) {
        self.collection.replace(collection);
    }

    /// Record a change produced outside the editing calls (pull repairs).
    pub fn record(&mut self, change: LocalChange) {
        self.changes.record(change);
    }

    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }

    fn collect_subtree(&self, id: &str, out: &mut Vec<ItemId>) {
        let children: Vec<ItemId> = self
            .collection
            .children_of(id)
            .into_iter()
            .map(|child| child.id.clone())
            .collect();
        for child in children {
            if !out.contains(&child) {
                self.collect_subtree(child.as_str(), out);
            }
        }
        out.push(ItemId::from(id));
    }

    fn check_placement(&self, item_type: ItemType, parent: &str) -> Result<()> {
        if parent == ROOT_ID {
            if item_type == ItemType::Page {
                return Err(Error::InvalidInput(
                    "Pages must belong to a document".to_string(),
                ));
            }
            return Ok(());
        }

        let parent_item = self
            .collection
            .get(parent)
            .ok_or_else(|| Error::NotFound(parent.to_string()))?;
        let holds_pages = matches!(parent_item.item_type, ItemType::Document | ItemType::Page);
        if holds_pages != (item_type == ItemType::Page) {
            return Err(Error::InvalidInput(format!(
                "A {item_type} cannot be placed under a {}",
                parent_item.item_type
            )));
        }
        Ok(())
    }

    fn check_move(&self, id: &str, target: &str) -> Result<()> {
        let item = self
            .collection
            .get(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.check_placement(item.item_type, target)?;

        // Walk up from the target; reaching `id` would create a cycle.
        let mut cursor = Some(target);
        let mut steps = 0;
        while let Some(current) = cursor {
            if current == id {
                return Err(Error::InvalidInput(format!(
                    "Cannot move {id} inside itself"
                )));
            }
            steps += 1;
            if steps > self.collection.len() {
                break;
            }
            cursor = self
                .collection
                .get(current)
                .map(|parent| parent.parent.value.as_str());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_item_uses_default_title_and_records_add() {
        let mut ws = Workspace::new();
        let id = ws
            .add_item_at(ItemType::Notebook, None, None, 10)
            .unwrap();

        let item = ws.collection().get(id.as_str()).unwrap();
        assert_eq!(item.title.value, "New notebook");
        assert!(item.parent.value.is_root());
        assert_eq!(ws.changes().entries(), &[LocalChange::add(id, 10)]);
    }

    #[test]
    fn add_item_assigns_sibling_order() {
        let mut ws = Workspace::new();
        let nb = ws.add_item_at(ItemType::Notebook, None, None, 1).unwrap();
        let first = ws
            .add_item_at(ItemType::Document, Some(nb.as_str()), Some("one"), 2)
            .unwrap();
        let second = ws
            .add_item_at(ItemType::Document, Some(nb.as_str()), Some("two"), 3)
            .unwrap();

        assert_eq!(ws.collection().get(first.as_str()).unwrap().order.value, 0);
        assert_eq!(ws.collection().get(second.as_str()).unwrap().order.value, 1);
    }

    #[test]
    fn add_item_rejects_bad_placement() {
        let mut ws = Workspace::new();
        assert!(matches!(
            ws.add_item_at(ItemType::Page, None, None, 1),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            ws.add_item_at(ItemType::Document, Some("nowhere"), None, 1),
            Err(Error::NotFound(_))
        ));

        let doc = ws.add_item_at(ItemType::Document, None, None, 1).unwrap();
        assert!(ws
            .add_item_at(ItemType::Page, Some(doc.as_str()), None, 2)
            .is_ok());
        assert!(matches!(
            ws.add_item_at(ItemType::Folder, Some(doc.as_str()), None, 3),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn set_field_records_update() {
        let mut collection = Collection::new();
        collection.insert(
            CollectionItem::new(ItemType::Document, ItemId::root(), "doc", 1).with_id("d"),
        );
        let mut ws = Workspace::from_parts(collection, ChangeLog::new());

        assert!(ws
            .set_field_at("d", FieldName::Title, FieldValue::Text("x".into()), 5)
            .unwrap());
        assert!(!ws
            .set_field_at("d", FieldName::Title, FieldValue::Text("x".into()), 6)
            .unwrap());

        assert_eq!(
            ws.changes().entries(),
            &[LocalChange::update(ItemId::from("d"), FieldName::Title, 5)]
        );
    }

    #[test]
    fn editing_a_conflict_copy_promotes_it() {
        let mut copy = CollectionItem::new(ItemType::Document, ItemId::root(), "doc", 1)
            .with_id("copy");
        copy.conflict = Some(ItemId::from("orig"));
        let mut ws = Workspace::from_parts(Collection::from_items([copy]), ChangeLog::new());

        ws.set_field_at("copy", FieldName::Title, FieldValue::Text("mine".into()), 9)
            .unwrap();

        assert_eq!(ws.conflict_count(), 0);
        assert_eq!(ws.changes().entries()[0].kind(), ChangeKind::Add);
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let mut ws = Workspace::new();
        let outer = ws.add_item_at(ItemType::Folder, None, None, 1).unwrap();
        let inner = ws
            .add_item_at(ItemType::Folder, Some(outer.as_str()), None, 2)
            .unwrap();

        let err = ws
            .set_field_at(
                outer.as_str(),
                FieldName::Parent,
                FieldValue::Text(inner.to_string()),
                3,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn delete_is_recursive() {
        let mut collection = Collection::new();
        collection.insert(
            CollectionItem::new(ItemType::Notebook, ItemId::root(), "nb", 1).with_id("nb"),
        );
        collection.insert(
            CollectionItem::new(ItemType::Document, ItemId::from("nb"), "doc", 1).with_id("doc"),
        );
        collection.insert(
            CollectionItem::new(ItemType::Page, ItemId::from("doc"), "", 1).with_id("page"),
        );
        collection.insert(
            CollectionItem::new(ItemType::Notebook, ItemId::root(), "other", 1).with_id("other"),
        );
        let mut ws = Workspace::from_parts(collection, ChangeLog::new());

        let removed = ws.delete_item_at("nb", 7).unwrap();

        assert_eq!(
            removed,
            vec![ItemId::from("page"), ItemId::from("doc"), ItemId::from("nb")]
        );
        assert_eq!(ws.collection().len(), 1);
        assert_eq!(ws.changes().len(), 3);
        assert!(ws
            .changes()
            .entries()
            .iter()
            .all(|change| change.kind() == ChangeKind::Delete));
    }

    #[test]
    fn delete_missing_item_fails() {
        let mut ws = Workspace::new();
        assert!(matches!(ws.delete_item("ghost"), Err(Error::NotFound(_))));
    }
}
