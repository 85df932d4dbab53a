use std::path::Path;

use quire_core::models::{FieldName, FieldValue};

use crate::commands::common::{capture_editor_input_with_initial, resolve_item_id, LocalState};
use crate::error::CliError;

/// Field edits requested on the command line.
#[derive(Debug, Default)]
pub struct FieldEdits {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<String>,
    pub parent: Option<String>,
    pub order: Option<i64>,
}

impl FieldEdits {
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.parent.is_none()
            && self.order.is_none()
    }
}

pub fn run_edit(id: &str, mut edits: FieldEdits, workspace_path: &Path) -> Result<(), CliError> {
    let mut state = LocalState::load(workspace_path)?;
    let id = resolve_item_id(state.workspace.collection(), id)?;

    if edits.is_empty() {
        let current = state
            .workspace
            .collection()
            .get(id.as_str())
            .map(|item| item.content.value.clone())
            .unwrap_or_default();
        let Some(edited) = capture_editor_input_with_initial(&current)? else {
            return Err(CliError::EmptyEditedContent);
        };
        edits.content = Some(edited);
    }

    let changed = apply_edits(&mut state, id.as_str(), edits)?;
    if changed {
        state.save(workspace_path)?;
    }
    println!("{id}");
    Ok(())
}

/// Apply each requested field in a fixed order; returns whether any changed.
pub fn apply_edits(state: &mut LocalState, id: &str, edits: FieldEdits) -> Result<bool, CliError> {
    let mut changed = false;

    if let Some(parent) = edits.parent {
        let parent = resolve_item_id(state.workspace.collection(), &parent)?;
        changed |= state.workspace.set_field(
            id,
            FieldName::Parent,
            FieldValue::Text(parent.to_string()),
        )?;
    }
    if let Some(title) = edits.title {
        changed |= state.workspace.set_field(
            id,
            FieldName::Title,
            FieldValue::Text(title.trim().to_string()),
        )?;
    }
    if let Some(content) = edits.content {
        changed |= state
            .workspace
            .set_field(id, FieldName::Content, FieldValue::Text(content))?;
    }
    if let Some(tags) = edits.tags {
        changed |= state
            .workspace
            .set_field(id, FieldName::Tags, FieldValue::Text(tags))?;
    }
    if let Some(order) = edits.order {
        changed |= state
            .workspace
            .set_field(id, FieldName::Order, FieldValue::Number(order))?;
    }

    Ok(changed)
}
