use std::path::Path;

use quire_core::models::{ChangeKind, LocalChange};

use crate::commands::common::{format_timestamp, short_id, ChangeListItem, LocalState};
use crate::error::CliError;

pub fn run_changes(as_json: bool, workspace_path: &Path) -> Result<(), CliError> {
    let state = LocalState::load(workspace_path)?;
    let changes = state.workspace.changes().entries();

    if as_json {
        let json_items = changes
            .iter()
            .map(change_to_list_item)
            .collect::<Vec<ChangeListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if changes.is_empty() {
        println!("No local changes.");
        return Ok(());
    }

    for line in format_change_lines(changes) {
        println!("{line}");
    }
    Ok(())
}

pub const fn change_label(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Add => "add",
        ChangeKind::Update => "update",
        ChangeKind::Delete => "delete",
    }
}

pub fn change_to_list_item(change: &LocalChange) -> ChangeListItem {
    ChangeListItem {
        item: change.item().to_string(),
        change: change_label(change.kind()).to_string(),
        field: change.field().map(|field| field.as_str().to_string()),
        updated: change.updated(),
        updated_iso: format_timestamp(change.updated()),
    }
}

pub fn format_change_lines(changes: &[LocalChange]) -> Vec<String> {
    changes
        .iter()
        .map(|change| {
            let field = change.field().map_or("-", |field| field.as_str());
            format!(
                "{}  {:<13}  {:<6}  {field:<7}",
                format_timestamp(change.updated()),
                short_id(change.item()),
                change_label(change.kind()),
            )
            .trim_end()
            .to_string()
        })
        .collect()
}
