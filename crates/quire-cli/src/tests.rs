use clap::Parser;
use pretty_assertions::assert_eq;
use quire_core::config::SyncSettings;
use quire_core::drivers::DriverConfig;
use quire_core::models::{FieldName, LocalChange};
use quire_core::strategy::StrategyKind;
use quire_core::{Collection, CollectionItem, ItemId, ItemType, SyncDirection, SyncReport, SyncState};

use crate::cli::{Cli, Commands, CompletionShell, DriverCommands, ItemKind, RemoteCommands, SyncMode};
use crate::commands::add::run_add;
use crate::commands::changes::format_change_lines;
use crate::commands::common::{
    format_relative_time, normalize_item_identifier, resolve_item_id, tree_order, LocalState,
};
use crate::commands::completions::completion_script;
use crate::commands::delete::run_delete;
use crate::commands::edit::{apply_edits, FieldEdits};
use crate::commands::remote::{driver_config, run_remote};
use crate::commands::sync::{format_report, run_sync};
use crate::error::CliError;

fn item(item_type: ItemType, id: &str, parent: &str, order: i64) -> CollectionItem {
    let mut item = CollectionItem::new(item_type, ItemId::from(parent), id, 1).with_id(id);
    item.order.value = order;
    item
}

#[test]
fn parses_add_with_parent() {
    let cli = Cli::try_parse_from(["quire", "add", "document", "Road", "trip", "--parent", "0190"])
        .unwrap();
    let Commands::Add {
        kind,
        title,
        parent,
    } = cli.command
    else {
        panic!("expected add");
    };
    assert_eq!(kind, ItemKind::Document);
    assert_eq!(title, vec!["Road", "trip"]);
    assert_eq!(parent.as_deref(), Some("0190"));
}

#[test]
fn parses_sync_modes() {
    let cli = Cli::try_parse_from(["quire", "sync"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Sync {
            mode: SyncMode::Sync,
            remote: None,
            json: false
        }
    ));

    let cli = Cli::try_parse_from(["quire", "sync", "force-pull", "--remote", "nas"]).unwrap();
    let Commands::Sync { mode, remote, .. } = cli.command else {
        panic!("expected sync");
    };
    assert_eq!(SyncDirection::from(mode), SyncDirection::ForcePull);
    assert_eq!(remote.as_deref(), Some("nas"));
}

#[test]
fn parses_remote_add_webdav() {
    let cli = Cli::try_parse_from([
        "quire",
        "--workspace",
        "/tmp/ws.json",
        "remote",
        "add",
        "nas",
        "--strategy",
        "bucket",
        "webdav",
        "https://dav.example.com",
        "--username",
        "alice",
    ])
    .unwrap();
    assert_eq!(
        cli.workspace.as_deref(),
        Some(std::path::Path::new("/tmp/ws.json"))
    );
    let Commands::Remote {
        command:
            RemoteCommands::Add {
                name,
                strategy,
                driver,
            },
    } = cli.command
    else {
        panic!("expected remote add");
    };
    assert_eq!(name, "nas");
    assert_eq!(StrategyKind::from(strategy), StrategyKind::Bucket);
    let DriverConfig::WebDav(config) = driver_config(driver).unwrap() else {
        panic!("expected webdav");
    };
    assert_eq!(config.url, "https://dav.example.com");
    assert_eq!(config.folder, "quire");
}

#[test]
fn r2_remote_requires_credentials() {
    let error = driver_config(DriverCommands::R2 {
        from_env: false,
        account_id: Some("acct".to_string()),
        bucket: None,
        access_key_id: Some("key".to_string()),
        secret_access_key: Some(" ".to_string()),
        prefix: String::new(),
    })
    .unwrap_err();
    let CliError::Config(message) = error else {
        panic!("expected config error");
    };
    assert!(message.contains("--bucket"));
    assert!(message.contains("--secret-access-key"));
}

#[test]
fn normalize_item_identifier_rejects_empty() {
    assert_eq!(normalize_item_identifier("  abc ").unwrap(), "abc");
    assert!(matches!(
        normalize_item_identifier("  "),
        Err(CliError::EmptyItemId)
    ));
}

#[test]
fn resolve_item_id_accepts_exact_prefix_and_root() {
    let collection = Collection::from_items([
        item(ItemType::Notebook, "abc-1", "home", 0),
        item(ItemType::Notebook, "abd-2", "home", 1),
    ]);

    assert_eq!(resolve_item_id(&collection, "abc-1").unwrap().as_str(), "abc-1");
    assert_eq!(resolve_item_id(&collection, "abd").unwrap().as_str(), "abd-2");
    assert!(resolve_item_id(&collection, "home").unwrap().is_root());
    assert!(matches!(
        resolve_item_id(&collection, "ab"),
        Err(CliError::AmbiguousItemId(_))
    ));
    assert!(matches!(
        resolve_item_id(&collection, "zzz"),
        Err(CliError::ItemNotFound(_))
    ));
}

#[test]
fn tree_order_follows_parents_and_order() {
    let collection = Collection::from_items([
        item(ItemType::Document, "doc", "nb", 1),
        item(ItemType::Folder, "folder", "nb", 0),
        item(ItemType::Notebook, "nb", "home", 0),
        item(ItemType::Document, "inner", "folder", 0),
    ]);

    let order: Vec<(usize, &str)> = tree_order(&collection)
        .into_iter()
        .map(|(depth, item)| (depth, item.id.as_str()))
        .collect();
    assert_eq!(
        order,
        vec![(0, "nb"), (1, "folder"), (2, "inner"), (1, "doc")]
    );
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn change_lines_name_the_field() {
    let lines = format_change_lines(&[
        LocalChange::add(ItemId::from("abc"), 0),
        LocalChange::update(ItemId::from("abc"), FieldName::Title, 0),
    ]);
    assert_eq!(lines[0], "1970-01-01 00:00:00 UTC  abc            add     -");
    assert_eq!(lines[1], "1970-01-01 00:00:00 UTC  abc            update  title");
}

#[test]
fn add_edit_delete_roundtrip_through_workspace_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workspace.json");

    run_add(ItemType::Notebook, &["Work".to_string()], None, &path).unwrap();
    let state = LocalState::load(&path).unwrap();
    let notebook = state.workspace.collection().iter().next().unwrap().id.clone();

    run_add(ItemType::Folder, &[], Some(notebook.as_str()), &path).unwrap();
    let mut state = LocalState::load(&path).unwrap();
    assert_eq!(state.workspace.collection().len(), 2);
    let folder = state
        .workspace
        .collection()
        .children_of(notebook.as_str())
        .first()
        .map(|item| item.id.clone())
        .unwrap();
    assert_eq!(
        state.workspace.collection().get(folder.as_str()).unwrap().title.value,
        "New folder"
    );

    let changed = apply_edits(
        &mut state,
        folder.as_str(),
        FieldEdits {
            title: Some(" Trips ".to_string()),
            tags: Some("travel, travel,2025".to_string()),
            ..FieldEdits::default()
        },
    )
    .unwrap();
    assert!(changed);
    let folder_item = state.workspace.collection().get(folder.as_str()).unwrap();
    assert_eq!(folder_item.title.value, "Trips");
    assert_eq!(folder_item.tag_list(), vec!["travel", "2025"]);
    state.save(&path).unwrap();

    run_delete(notebook.as_str(), &path).unwrap();
    let state = LocalState::load(&path).unwrap();
    assert!(state.workspace.collection().is_empty());
    // Adds that were never pushed vanish along with the items.
    assert!(state.workspace.changes().is_empty());
}

#[tokio::test]
async fn sync_pushes_to_directory_remote_and_saves_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let workspace_path = dir.path().join("workspace.json");
    let settings_path = dir.path().join("config").join("remotes.json");
    let remote_dir = dir.path().join("remote");

    run_remote(
        RemoteCommands::Add {
            name: "home".to_string(),
            strategy: crate::cli::StrategyArg::Single,
            driver: DriverCommands::Dir {
                path: remote_dir.clone(),
            },
        },
        &settings_path,
        &workspace_path,
    )
    .unwrap();
    assert_eq!(
        SyncSettings::load_from_path(&settings_path)
            .unwrap()
            .remotes
            .len(),
        1
    );

    run_add(ItemType::Notebook, &["Work".to_string()], None, &workspace_path).unwrap();
    run_sync(
        SyncDirection::Sync,
        None,
        false,
        &settings_path,
        &workspace_path,
    )
    .await
    .unwrap();

    assert!(remote_dir.join("collection.json").exists());
    assert!(remote_dir.join("S1").exists());
    let state = LocalState::load(&workspace_path).unwrap();
    assert!(state.workspace.changes().is_empty());
    let cursor = state.remotes.get("home").unwrap();
    assert!(cursor.connected);
    assert!(cursor.last_pulled > 0);

    run_remote(
        RemoteCommands::Remove {
            name: "home".to_string(),
        },
        &settings_path,
        &workspace_path,
    )
    .unwrap();
    assert!(LocalState::load(&workspace_path)
        .unwrap()
        .remotes
        .is_empty());
}

#[tokio::test]
async fn sync_without_remotes_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_sync(
        SyncDirection::Sync,
        None,
        false,
        &dir.path().join("remotes.json"),
        &dir.path().join("workspace.json"),
    )
    .await;
    assert!(matches!(result, Err(CliError::NoRemotes)));
}

#[test]
fn report_mentions_conflicts() {
    let report = SyncReport {
        direction: SyncDirection::Sync,
        state: SyncState::Conflicts,
        pulled: true,
        pushed: false,
        conflicts: 2,
        connected: true,
    };
    assert_eq!(
        format_report(&report),
        "sync: pulled; 2 conflict(s) need attention (see `quire conflicts`)"
    );
}

#[test]
fn completion_script_names_binary() {
    let script = String::from_utf8(completion_script(CompletionShell::Bash)).unwrap();
    assert!(script.contains("quire"));
}
