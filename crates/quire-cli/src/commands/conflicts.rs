use std::path::Path;

use quire_core::CollectionItem;

use crate::commands::common::{
    display_title, format_timestamp, item_to_list_item, short_id, ItemListItem, LocalState,
};
use crate::error::CliError;

pub fn run_conflicts(as_json: bool, workspace_path: &Path) -> Result<(), CliError> {
    let state = LocalState::load(workspace_path)?;
    let conflicts = state.workspace.conflicts();

    if as_json {
        let json_items = conflicts
            .iter()
            .map(|item| item_to_list_item(item, 0))
            .collect::<Vec<ItemListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicts.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_conflict_lines(conflicts: &[&CollectionItem]) -> Vec<String> {
    conflicts
        .iter()
        .map(|item| {
            let origin = match &item.conflict {
                Some(original) if original != &item.id => format!("copy of {}", short_id(original)),
                _ => "relocated".to_string(),
            };
            format!(
                "{}  {}  {:<13}  {}",
                format_timestamp(item.updated),
                short_id(&item.id),
                origin,
                display_title(item)
            )
        })
        .collect()
}
