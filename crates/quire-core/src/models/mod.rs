//! Data models for Quire

mod change;
mod item;
mod remote;

pub use change::{ChangeKind, LocalChange};
pub use item::{
    preview_of, CollectionItem, FieldName, FieldValue, ItemId, ItemType, Tracked,
    CONFLICTS_NOTEBOOK_ID, CONFLICTS_NOTEBOOK_TITLE, ROOT_ID,
};
pub use remote::{DriverFileInfo, FilesInfo, RemoteInfo};
