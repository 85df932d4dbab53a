//! Remote layouts for the collection snapshot.
//!
//! A strategy only knows how to find, read, and write the snapshot. The push
//! and pull algorithms live in [`crate::engine`] and are shared by every
//! layout through the provided methods of [`StorageStrategy`].

mod bucket;
mod single_file;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::{Snapshot, MODEL_VERSION};
use crate::collection::Collection;
use crate::drivers::StorageDriver;
use crate::engine::{self, PullOutcome, PushOutcome};
use crate::models::{CollectionItem, DriverFileInfo, FilesInfo, LocalChange, RemoteInfo};
use crate::{Error, Result};

pub use bucket::{BucketStorage, DEFAULT_MAX_BUCKET_BYTES};
pub use single_file::SingleFileStorage;

/// Descriptor of the file whose revision stands for the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteHead {
    pub connected: bool,
    pub info: Option<DriverFileInfo>,
    pub last_remote_change: i64,
}

impl RemoteHead {
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            connected: false,
            info: None,
            last_remote_change: 0,
        }
    }

    #[must_use]
    pub fn from_files(files: &FilesInfo, head_file: &str) -> Self {
        if !files.connected {
            return Self::offline();
        }
        let info = files.find(head_file).cloned();
        Self {
            connected: true,
            last_remote_change: info.as_ref().map_or(0, |info| info.updated),
            info,
        }
    }

    /// Fold this probe into cached state without moving the pull cursor.
    #[must_use]
    pub fn merge_into(&self, cached: &RemoteInfo) -> RemoteInfo {
        if !self.connected {
            return cached.disconnected();
        }
        RemoteInfo {
            connected: true,
            last_remote_change: self.last_remote_change,
            last_pulled: cached.last_pulled,
            info: self.info.clone().or_else(|| cached.info.clone()),
        }
    }
}

/// How a snapshot is laid out on a remote.
#[allow(async_fn_in_trait)]
pub trait StorageStrategy {
    fn driver_name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    /// Probe the remote and write the version marker if it is missing.
    async fn connect(&self) -> Result<RemoteHead>;

    async fn fetch_head(&self) -> Result<RemoteHead>;

    async fn read_snapshot(&self, head: &DriverFileInfo) -> Result<Snapshot>;

    /// Write the snapshot; the returned descriptor is the new head.
    async fn write_snapshot(&self, items: &[CollectionItem], updated: i64)
        -> Result<DriverFileInfo>;

    async fn push(
        &self,
        content: &Collection,
        changes: &[LocalChange],
        cached: &RemoteInfo,
        force: bool,
    ) -> Result<PushOutcome> {
        engine::push(self, content, changes, cached, force).await
    }

    async fn pull(
        &self,
        content: &Collection,
        changes: &[LocalChange],
        cached: &RemoteInfo,
        force: bool,
    ) -> Result<PullOutcome> {
        engine::pull(self, content, changes, cached, force).await
    }
}

/// Selectable remote layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Single,
    Bucket,
}

impl StrategyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Bucket => "bucket",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "single_file" => Ok(Self::Single),
            "bucket" => Ok(Self::Bucket),
            other => Err(Error::InvalidInput(format!("Unknown storage strategy: {other}"))),
        }
    }
}

/// Strategy selected at configuration time.
#[derive(Debug, Clone)]
pub enum AnyStrategy<D> {
    Single(SingleFileStorage<D>),
    Bucket(BucketStorage<D>),
}

impl<D: StorageDriver> AnyStrategy<D> {
    pub fn new(kind: StrategyKind, driver: D) -> Self {
        match kind {
            StrategyKind::Single => Self::Single(SingleFileStorage::new(driver)),
            StrategyKind::Bucket => Self::Bucket(BucketStorage::new(driver)),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> StrategyKind {
        match self {
            Self::Single(_) => StrategyKind::Single,
            Self::Bucket(_) => StrategyKind::Bucket,
        }
    }
}

impl<D: StorageDriver> StorageStrategy for AnyStrategy<D> {
    fn driver_name(&self) -> &'static str {
        match self {
            Self::Single(strategy) => strategy.driver_name(),
            Self::Bucket(strategy) => strategy.driver_name(),
        }
    }

    fn is_configured(&self) -> bool {
        match self {
            Self::Single(strategy) => strategy.is_configured(),
            Self::Bucket(strategy) => strategy.is_configured(),
        }
    }

    async fn connect(&self) -> Result<RemoteHead> {
        match self {
            Self::Single(strategy) => strategy.connect().await,
            Self::Bucket(strategy) => strategy.connect().await,
        }
    }

    async fn fetch_head(&self) -> Result<RemoteHead> {
        match self {
            Self::Single(strategy) => strategy.fetch_head().await,
            Self::Bucket(strategy) => strategy.fetch_head().await,
        }
    }

    async fn read_snapshot(&self, head: &DriverFileInfo) -> Result<Snapshot> {
        match self {
            Self::Single(strategy) => strategy.read_snapshot(head).await,
            Self::Bucket(strategy) => strategy.read_snapshot(head).await,
        }
    }

    async fn write_snapshot(
        &self,
        items: &[CollectionItem],
        updated: i64,
    ) -> Result<DriverFileInfo> {
        match self {
            Self::Single(strategy) => strategy.write_snapshot(items, updated).await,
            Self::Bucket(strategy) => strategy.write_snapshot(items, updated).await,
        }
    }
}

/// Probe `head_file` and `version_file`, writing the marker when absent.
async fn connect_driver<D: StorageDriver>(
    driver: &D,
    head_file: &str,
    version_file: &str,
) -> Result<RemoteHead> {
    let files = driver.fetch_files_info(&[head_file, version_file]).await?;
    if !files.connected {
        return Ok(RemoteHead::offline());
    }
    if files.find(version_file).is_none() {
        tracing::warn!(
            driver = driver.name(),
            version_file,
            "Version file is missing, assuming first push"
        );
        driver
            .push_file(version_file, &MODEL_VERSION.to_string())
            .await?;
    }
    Ok(RemoteHead::from_files(&files, head_file))
}

/// Download a file the head said exists.
async fn pull_required<D: StorageDriver>(driver: &D, info: &DriverFileInfo) -> Result<String> {
    driver
        .pull_file(&info.providerid, &info.filename)
        .await?
        .ok_or_else(|| {
            Error::Storage(format!(
                "Remote file {} disappeared during sync",
                info.filename
            ))
        })
}
