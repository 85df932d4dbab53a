use pretty_assertions::assert_eq;

use super::*;
use crate::collection::{ChangeLog, Collection};
use crate::drivers::MemoryDriver;
use crate::models::{
    ChangeKind, CollectionItem, FieldName, FieldValue, ItemId, ItemType, ROOT_ID,
};
use crate::strategy::{AnyStrategy, StrategyKind};

type Service = SyncService<AnyStrategy<MemoryDriver>>;

fn item(item_type: ItemType, id: &str, title: &str, at: i64) -> CollectionItem {
    CollectionItem::new(item_type, ItemId::root(), title, at).with_id(id)
}

async fn service(driver: &MemoryDriver, kind: StrategyKind) -> Service {
    let mut service = Service::new();
    service
        .add_remote("primary", AnyStrategy::new(kind, driver.clone()), RemoteInfo::default())
        .unwrap();
    service.connect_all().await.unwrap();
    service
}

async fn seed_remote(driver: &MemoryDriver, kind: StrategyKind, items: &[CollectionItem]) {
    AnyStrategy::new(kind, driver.clone())
        .write_snapshot(items, 10)
        .await
        .unwrap();
}

fn titles(workspace: &Workspace) -> Vec<String> {
    workspace
        .collection()
        .iter()
        .map(|item| item.title.value.clone())
        .collect()
}

async fn two_clients_share_pushed_additions(kind: StrategyKind) {
    let driver = MemoryDriver::new();
    seed_remote(
        &driver,
        kind,
        &[
            item(ItemType::Document, "r1", "r1", 10),
            item(ItemType::Document, "r2", "r2", 10),
            item(ItemType::Folder, "r3", "r3", 10),
        ],
    )
    .await;

    let mut first = service(&driver, kind).await;
    let mut laptop = Workspace::new();
    let report = first.pull(&mut laptop, None, false).await.unwrap();
    assert!(report.pulled);
    assert_eq!(laptop.collection().len(), 3);

    laptop.add_item(ItemType::Folder, None, None).unwrap();
    let report = first.push(&mut laptop, None, false).await.unwrap();
    assert!(report.pushed);
    assert_eq!(report.state, SyncState::Synced);
    assert!(!laptop.has_local_changes());

    let mut second = service(&driver, kind).await;
    let mut phone = Workspace::new();
    second.pull(&mut phone, None, false).await.unwrap();
    assert_eq!(titles(&phone), vec!["r1", "r2", "r3", "New folder"]);
}

#[tokio::test]
async fn second_client_sees_pushed_folder_in_order() {
    two_clients_share_pushed_additions(StrategyKind::Single).await;
}

#[tokio::test]
async fn second_client_sees_pushed_folder_in_order_with_buckets() {
    two_clients_share_pushed_additions(StrategyKind::Bucket).await;
}

#[tokio::test]
async fn connect_all_writes_version_marker_and_reads_head() {
    let driver = MemoryDriver::new();
    seed_remote(&driver, StrategyKind::Single, &[item(ItemType::Notebook, "nb", "nb", 1)]).await;

    let service = service(&driver, StrategyKind::Single).await;

    let primary = service.primary().unwrap();
    assert!(service.primary_connected());
    assert!(primary.info.info.is_some());
    assert_eq!(primary.info.last_pulled, 0);
    assert!(primary.info.has_unpulled_change());
    assert!(driver.file("S1").is_some());
}

#[tokio::test]
async fn sync_pulls_then_pushes_local_changes() {
    let driver = MemoryDriver::new();
    let mut service = service(&driver, StrategyKind::Single).await;
    let mut workspace = Workspace::new();
    workspace
        .add_item(ItemType::Notebook, None, Some("Work"))
        .unwrap();

    let report = service.sync(&mut workspace).await.unwrap();

    assert_eq!(report.direction, SyncDirection::Sync);
    assert!(report.pushed);
    assert_eq!(report.state, SyncState::Synced);
    assert!(!service.has_pending_push(&workspace));
    let primary = &service.remotes()[0].info;
    assert_eq!(primary.last_pulled, primary.last_remote_change);
}

#[tokio::test]
async fn sync_holds_back_push_while_conflicts_exist() {
    let driver = MemoryDriver::new();
    let mut remote_doc = item(ItemType::Document, "d", "doc", 1);
    remote_doc
        .set_field(FieldName::Title, FieldValue::Text("theirs".into()), 500)
        .unwrap();
    seed_remote(&driver, StrategyKind::Single, &[remote_doc]).await;

    let mut service = service(&driver, StrategyKind::Single).await;
    let mut workspace = Workspace::from_parts(
        Collection::from_items([item(ItemType::Document, "d", "doc", 1)]),
        ChangeLog::new(),
    );
    workspace
        .set_field_at("d", FieldName::Title, FieldValue::Text("mine".into()), 100)
        .unwrap();
    let pushes = driver.push_count();

    let report = service.sync(&mut workspace).await.unwrap();

    assert!(report.pulled);
    assert!(!report.pushed);
    assert_eq!(report.state, SyncState::Conflicts);
    assert_eq!(report.conflicts, 1);
    assert_eq!(driver.push_count(), pushes);
    assert!(workspace.has_local_changes());
    assert_eq!(workspace.collection().get("d").unwrap().title.value, "theirs");
}

#[tokio::test]
async fn conflict_copy_survives_later_remote_changes() {
    let driver = MemoryDriver::new();
    let mut remote_doc = item(ItemType::Document, "d", "doc", 1);
    remote_doc
        .set_field(FieldName::Title, FieldValue::Text("theirs".into()), 500)
        .unwrap();
    seed_remote(&driver, StrategyKind::Single, &[remote_doc.clone()]).await;

    let mut service = service(&driver, StrategyKind::Single).await;
    let mut workspace = Workspace::from_parts(
        Collection::from_items([item(ItemType::Document, "d", "doc", 1)]),
        ChangeLog::new(),
    );
    workspace
        .set_field_at("d", FieldName::Title, FieldValue::Text("mine".into()), 100)
        .unwrap();

    service.sync(&mut workspace).await.unwrap();
    assert_eq!(titles(&workspace), vec!["theirs", "mine"]);

    // Another device pushes an unrelated notebook.
    AnyStrategy::new(StrategyKind::Single, driver.clone())
        .write_snapshot(&[remote_doc, item(ItemType::Notebook, "other", "other", 600)], 600)
        .await
        .unwrap();
    let report = service.sync(&mut workspace).await.unwrap();

    assert!(report.pulled);
    assert_eq!(report.state, SyncState::Conflicts);
    assert_eq!(report.conflicts, 1);
    assert_eq!(titles(&workspace), vec!["theirs", "other", "mine"]);
}

#[tokio::test]
async fn resolving_a_conflict_copy_makes_it_pushable() {
    let driver = MemoryDriver::new();
    let mut service = service(&driver, StrategyKind::Single).await;
    let original = item(ItemType::Document, "d", "doc", 1);
    let mut copy = original.conflict_copy(2);
    copy.id = ItemId::from("copy");
    let mut workspace =
        Workspace::from_parts(Collection::from_items([original, copy]), ChangeLog::new());

    workspace
        .set_field("copy", FieldName::Title, FieldValue::Text("kept mine".into()))
        .unwrap();
    let report = service.sync(&mut workspace).await.unwrap();

    assert!(report.pushed);
    let pushed = crate::codec::deserialize(&driver.file("collection.json").unwrap()).unwrap();
    assert!(pushed.items.iter().any(|item| item.title.value == "kept mine"));
}

#[tokio::test]
async fn offline_primary_reports_offline_and_keeps_changes() {
    let driver = MemoryDriver::new();
    let mut service = service(&driver, StrategyKind::Single).await;
    let mut workspace = Workspace::new();
    workspace.add_item(ItemType::Notebook, None, None).unwrap();
    driver.set_online(false);

    let report = service
        .run(&mut workspace, SyncDirection::Sync, None)
        .await
        .unwrap();

    assert_eq!(report.state, SyncState::Offline);
    assert!(!report.connected);
    assert!(!service.primary_connected());
    assert!(workspace.has_local_changes());
    assert!(service.has_pending_push(&workspace));
}

#[tokio::test]
async fn push_goes_to_every_connected_remote() {
    let home = MemoryDriver::new();
    let backup = MemoryDriver::new();
    let mut service = Service::new();
    service
        .add_remote(
            "home",
            AnyStrategy::new(StrategyKind::Single, home.clone()),
            RemoteInfo::default(),
        )
        .unwrap();
    service
        .add_remote(
            "backup",
            AnyStrategy::new(StrategyKind::Bucket, backup.clone()),
            RemoteInfo::default(),
        )
        .unwrap();
    service.connect_all().await.unwrap();

    let mut workspace = Workspace::new();
    workspace.add_item(ItemType::Notebook, None, None).unwrap();
    let report = service
        .run(&mut workspace, SyncDirection::Push, None)
        .await
        .unwrap();

    assert!(report.pushed);
    assert!(home.file("collection.json").is_some());
    assert!(backup.file("buckets.json").is_some());
    assert!(!workspace.has_local_changes());
    assert_eq!(service.remote_infos().len(), 2);
}

#[tokio::test]
async fn push_to_named_remote_only() {
    let home = MemoryDriver::new();
    let backup = MemoryDriver::new();
    let mut service = Service::new();
    service
        .add_remote(
            "home",
            AnyStrategy::new(StrategyKind::Single, home.clone()),
            RemoteInfo::default(),
        )
        .unwrap();
    service
        .add_remote(
            "backup",
            AnyStrategy::new(StrategyKind::Single, backup.clone()),
            RemoteInfo::default(),
        )
        .unwrap();
    service.connect_all().await.unwrap();

    let mut workspace = Workspace::new();
    workspace.add_item(ItemType::Notebook, None, None).unwrap();
    service
        .push(&mut workspace, Some("backup"), false)
        .await
        .unwrap();

    assert!(home.file("collection.json").is_none());
    assert!(backup.file("collection.json").is_some());
    assert!(matches!(
        service.push(&mut workspace, Some("nowhere"), false).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn force_pull_discards_local_state() {
    let driver = MemoryDriver::new();
    seed_remote(&driver, StrategyKind::Single, &[item(ItemType::Notebook, "nb", "remote", 1)]).await;
    let mut service = service(&driver, StrategyKind::Single).await;
    let mut workspace = Workspace::new();
    workspace
        .add_item(ItemType::Notebook, None, Some("local"))
        .unwrap();

    let report = service
        .run(&mut workspace, SyncDirection::ForcePull, None)
        .await
        .unwrap();

    assert_eq!(report.direction, SyncDirection::ForcePull);
    assert_eq!(titles(&workspace), vec!["remote"]);
    assert!(!workspace.has_local_changes());
    assert_eq!(report.state, SyncState::Synced);
}

#[tokio::test]
async fn force_push_replaces_remote() {
    let driver = MemoryDriver::new();
    seed_remote(&driver, StrategyKind::Single, &[item(ItemType::Notebook, "nb", "remote", 1)]).await;
    let mut service = service(&driver, StrategyKind::Single).await;
    let mut workspace = Workspace::new();
    workspace
        .add_item(ItemType::Notebook, None, Some("local"))
        .unwrap();

    let report = service
        .run(&mut workspace, SyncDirection::ForcePush, None)
        .await
        .unwrap();

    assert!(report.pushed);
    let remote = crate::codec::deserialize(&driver.file("collection.json").unwrap()).unwrap();
    let remote_titles: Vec<&str> = remote
        .items
        .iter()
        .map(|item| item.title.value.as_str())
        .collect();
    assert_eq!(remote_titles, vec!["local"]);
}

#[tokio::test]
async fn orphan_repair_records_conflicts_notebook_for_push() {
    let driver = MemoryDriver::new();
    seed_remote(&driver, StrategyKind::Single, &[item(ItemType::Notebook, "nb", "nb", 1)]).await;
    let mut service = service(&driver, StrategyKind::Single).await;

    let mut collection = Collection::from_items([item(ItemType::Notebook, "nb", "nb", 1)]);
    collection.insert(
        CollectionItem::new(ItemType::Folder, ItemId::from("nb"), "gone", 1).with_id("gone"),
    );
    let mut workspace = Workspace::from_parts(collection, ChangeLog::new());
    workspace
        .add_item_at(ItemType::Document, Some("gone"), Some("stray"), 50)
        .unwrap();

    let report = service.pull(&mut workspace, None, false).await.unwrap();

    assert_eq!(report.state, SyncState::Conflicts);
    let changes = workspace.changes().entries();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1].kind(), ChangeKind::Add);
    assert_eq!(changes[1].item().as_str(), crate::models::CONFLICTS_NOTEBOOK_ID);
    assert!(workspace
        .collection()
        .get(crate::models::CONFLICTS_NOTEBOOK_ID)
        .is_some_and(|notebook| notebook.parent.value.as_str() == ROOT_ID));
}

#[tokio::test]
async fn pull_without_remotes_is_an_error() {
    let mut service = Service::new();
    let mut workspace = Workspace::new();
    assert!(matches!(
        service.pull(&mut workspace, None, false).await,
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn duplicate_remote_names_are_rejected() {
    let mut service = Service::new();
    let strategy = AnyStrategy::new(StrategyKind::Single, MemoryDriver::new());
    service
        .add_remote("home", strategy.clone(), RemoteInfo::default())
        .unwrap();
    assert!(service
        .add_remote("home", strategy, RemoteInfo::default())
        .is_err());
}

#[test]
fn sync_direction_parses() {
    assert_eq!(
        "force-push".parse::<SyncDirection>().unwrap(),
        SyncDirection::ForcePush
    );
    assert_eq!(SyncDirection::ForcePull.to_string(), "force-pull");
    assert!("sideways".parse::<SyncDirection>().is_err());
}
