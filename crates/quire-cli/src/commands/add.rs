use std::path::Path;

use quire_core::models::{FieldName, FieldValue};
use quire_core::ItemType;

use crate::commands::common::{read_piped_stdin, resolve_item_id, LocalState};
use crate::error::CliError;

pub fn run_add(
    item_type: ItemType,
    title_parts: &[String],
    parent: Option<&str>,
    workspace_path: &Path,
) -> Result<(), CliError> {
    let mut state = LocalState::load(workspace_path)?;
    let parent = parent
        .map(|query| resolve_item_id(state.workspace.collection(), query))
        .transpose()?;

    let title = title_parts.join(" ");
    let id = state
        .workspace
        .add_item(item_type, parent.as_ref().map(|id| id.as_str()), Some(&title))?;

    if matches!(item_type, ItemType::Document | ItemType::Page) {
        if let Some(content) = read_piped_stdin()? {
            state
                .workspace
                .set_field(id.as_str(), FieldName::Content, FieldValue::Text(content))?;
        }
    }

    state.save(workspace_path)?;
    println!("{id}");
    Ok(())
}
