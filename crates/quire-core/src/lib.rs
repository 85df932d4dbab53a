//! quire-core - Core library for Quire
//!
//! This crate contains the collection model, the local change log, the
//! push/pull sync engine, and the storage drivers used by every Quire
//! interface.

pub mod codec;
pub mod collection;
pub mod config;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod models;
pub mod state;
pub mod strategy;
pub mod sync;
pub mod util;

pub use collection::{ChangeLog, Collection, Workspace, WorkspaceFile};
pub use error::{Error, Result};
pub use models::{CollectionItem, ItemId, ItemType, LocalChange};
pub use state::SyncState;
pub use sync::{SyncDirection, SyncReport, SyncService};
