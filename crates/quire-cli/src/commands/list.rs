use std::path::Path;

use crate::commands::common::{
    display_title, format_item_lines, format_timestamp, item_to_list_item, render_tags,
    resolve_item_id, tree_order, ItemListItem, LocalState,
};
use crate::error::CliError;

pub fn run_list(as_json: bool, workspace_path: &Path) -> Result<(), CliError> {
    let state = LocalState::load(workspace_path)?;
    let collection = state.workspace.collection();

    if as_json {
        let json_items = tree_order(collection)
            .into_iter()
            .map(|(depth, item)| item_to_list_item(item, depth))
            .collect::<Vec<ItemListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if collection.is_empty() {
        println!("The collection is empty.");
    } else {
        for line in format_item_lines(collection) {
            println!("{line}");
        }
    }

    Ok(())
}

pub fn run_show(id: &str, as_json: bool, workspace_path: &Path) -> Result<(), CliError> {
    let state = LocalState::load(workspace_path)?;
    let collection = state.workspace.collection();
    let id = resolve_item_id(collection, id)?;
    let item = collection
        .get(id.as_str())
        .ok_or_else(|| CliError::ItemNotFound(id.to_string()))?;

    if as_json {
        let mut value = serde_json::to_value(item_to_list_item(item, 0))?;
        value["content"] = serde_json::Value::String(item.content.value.clone());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}  {}", item.id, display_title(item));
    println!("type:     {}", item.item_type);
    println!("parent:   {}", item.parent.value);
    println!("updated:  {}", format_timestamp(item.updated));
    let tags = render_tags(item);
    if !tags.is_empty() {
        println!("tags:     {tags}");
    }
    if let Some(original) = &item.conflict {
        if original == &item.id {
            println!("conflict: relocated, former parent is gone");
        } else {
            println!("conflict: copy of {original}");
        }
    }
    if !item.content.value.is_empty() {
        println!();
        println!("{}", item.content.value);
    }
    Ok(())
}
