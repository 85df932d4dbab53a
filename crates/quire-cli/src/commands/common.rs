use std::collections::{BTreeMap, HashSet};
use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use quire_core::collection::WORKSPACE_FILE_NAME;
use quire_core::config::SETTINGS_FILE_NAME;
use quire_core::models::{RemoteInfo, ROOT_ID};
use quire_core::{Collection, CollectionItem, ItemId, ItemType, Workspace, WorkspaceFile};
use serde::Serialize;

use crate::error::CliError;

/// A device's workspace together with its per-remote sync cursors.
#[derive(Debug, Default)]
pub struct LocalState {
    pub workspace: Workspace,
    pub remotes: BTreeMap<String, RemoteInfo>,
}

impl LocalState {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let (workspace, remotes) = WorkspaceFile::load_from_path(path)?.into_workspace();
        Ok(Self { workspace, remotes })
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        WorkspaceFile::capture(&self.workspace, self.remotes.clone()).save_to_path(path)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ItemListItem {
    pub id: String,
    pub parent: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub preview: String,
    pub tags: Vec<String>,
    pub order: i64,
    pub depth: usize,
    pub created: i64,
    pub updated: i64,
    pub relative_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChangeListItem {
    pub item: String,
    pub change: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub updated: i64,
    pub updated_iso: String,
}

pub fn resolve_workspace_path(cli_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_path.or_else(|| env::var_os("QUIRE_WORKSPACE").map(PathBuf::from)) {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join("quire").join(WORKSPACE_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve data directory".to_string()))
}

pub fn resolve_settings_path(cli_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_path.or_else(|| env::var_os("QUIRE_CONFIG").map(PathBuf::from)) {
        return Ok(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("quire").join(SETTINGS_FILE_NAME))
        .ok_or_else(|| CliError::Config("Failed to resolve config directory".to_string()))
}

pub fn normalize_item_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyItemId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Resolve an exact ID, the root alias, or a unique ID prefix.
pub fn resolve_item_id(collection: &Collection, query: &str) -> Result<ItemId, CliError> {
    let query = normalize_item_identifier(query)?;
    if query == ROOT_ID || collection.contains(&query) {
        return Ok(ItemId::from(query));
    }

    let matching_ids: Vec<&ItemId> = collection
        .iter()
        .map(|item| &item.id)
        .filter(|id| id.as_str().starts_with(&query))
        .take(3)
        .collect();

    match matching_ids.as_slice() {
        [] => Err(CliError::ItemNotFound(query)),
        [id] => Ok((*id).clone()),
        _ => {
            let options = matching_ids
                .iter()
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousItemId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &ItemId) -> String {
    id.as_str().chars().take(13).collect()
}

/// Items in tree order with their depth below the root.
pub fn tree_order(collection: &Collection) -> Vec<(usize, &CollectionItem)> {
    fn walk<'a>(
        collection: &'a Collection,
        parent: &str,
        depth: usize,
        seen: &mut HashSet<&'a str>,
        out: &mut Vec<(usize, &'a CollectionItem)>,
    ) {
        let mut children = collection.children_of(parent);
        children.sort_by_key(|item| item.order.value);
        for child in children {
            if seen.insert(child.id.as_str()) {
                out.push((depth, child));
                walk(collection, child.id.as_str(), depth + 1, seen, out);
            }
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(collection.len());
    walk(collection, ROOT_ID, 0, &mut seen, &mut out);
    for item in collection.iter() {
        if seen.insert(item.id.as_str()) {
            out.push((0, item));
        }
    }
    out
}

pub fn format_item_lines(collection: &Collection) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    tree_order(collection)
        .into_iter()
        .map(|(depth, item)| {
            let indent = "  ".repeat(depth);
            let label = format!("{indent}{} {}", type_marker(item), display_title(item));
            let relative_time = format_relative_time(item.updated, now_ms);
            let tags = render_tags(item);

            if tags.is_empty() {
                format!("{}  {label:<40}  {relative_time}", short_id(&item.id))
            } else {
                format!(
                    "{}  {label:<40}  {relative_time:<10}  {tags}",
                    short_id(&item.id)
                )
            }
        })
        .collect()
}

pub fn item_to_list_item(item: &CollectionItem, depth: usize) -> ItemListItem {
    let now_ms = Utc::now().timestamp_millis();
    ItemListItem {
        id: item.id.to_string(),
        parent: item.parent.value.to_string(),
        item_type: item.item_type.as_str().to_string(),
        title: item.title.value.clone(),
        preview: item.preview.clone(),
        tags: item.tag_list(),
        order: item.order.value,
        depth,
        created: item.created,
        updated: item.updated,
        relative_time: format_relative_time(item.updated, now_ms),
        conflict: item.conflict.as_ref().map(ToString::to_string),
    }
}

pub fn display_title(item: &CollectionItem) -> String {
    let title = item.title.value.trim();
    if !title.is_empty() {
        return title.to_string();
    }
    if item.preview.is_empty() {
        "(untitled)".to_string()
    } else {
        item.preview.clone()
    }
}

pub const fn type_marker(item: &CollectionItem) -> char {
    match item.item_type {
        ItemType::Notebook => '#',
        ItemType::Folder => '+',
        ItemType::Document => '-',
        ItemType::Page => '~',
    }
}

pub fn render_tags(item: &CollectionItem) -> String {
    item.tag_list()
        .into_iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_item_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let status = Command::new(program).args(parts).arg(file_path).status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_item_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("quire-item-{}-{now}.md", std::process::id()))
}
