use std::path::Path;

use crate::commands::common::{resolve_item_id, LocalState};
use crate::error::CliError;

pub fn run_delete(id: &str, workspace_path: &Path) -> Result<(), CliError> {
    let mut state = LocalState::load(workspace_path)?;
    let id = resolve_item_id(state.workspace.collection(), id)?;

    let removed = state.workspace.delete_item(id.as_str())?;
    state.save(workspace_path)?;

    for removed_id in removed {
        println!("{removed_id}");
    }
    Ok(())
}
