use crate::collection::Collection;
use crate::models::{CollectionItem, ItemId, LocalChange, CONFLICTS_NOTEBOOK_ID};

/// Move items whose parent no longer resolves into the conflicts notebook,
/// creating it on first need. Relocated items are flagged as conflicts of
/// themselves; conflict copies keep pointing at their original.
///
/// Returns the change log entries the repair produced and the number of
/// relocated items.
pub fn repair_orphans(collection: &mut Collection, at: i64) -> (Vec<LocalChange>, usize) {
    let orphans: Vec<ItemId> = collection
        .iter()
        .filter(|item| !collection.resolves(item.parent.value.as_str()))
        .map(|item| item.id.clone())
        .collect();
    if orphans.is_empty() {
        return (Vec::new(), 0);
    }

    let mut recorded = Vec::new();
    if !collection.contains(CONFLICTS_NOTEBOOK_ID) {
        collection.insert(CollectionItem::conflicts_notebook(at));
        recorded.push(LocalChange::add(ItemId::conflicts(), at));
    }

    for id in &orphans {
        if let Some(item) = collection.get_mut(id.as_str()) {
            tracing::debug!(item = %id, parent = %item.parent.value, "Relocating orphan");
            item.parent.value = ItemId::conflicts();
            if item.conflict.is_none() {
                item.conflict = Some(id.clone());
            }
        }
    }

    (recorded, orphans.len())
}
