//! Collection split into size-bounded shards plus a manifest.
//!
//! Shards (`bucket-N.json`) are ordinary snapshots holding a slice of the
//! items. The manifest (`buckets.json`) lists them and is written last, so
//! its revision is the revision of the whole collection.

use serde::{Deserialize, Serialize};

use crate::codec::{self, Snapshot, MODEL_VERSION};
use crate::drivers::StorageDriver;
use crate::models::{CollectionItem, DriverFileInfo};
use crate::{Error, Result};

use super::{connect_driver, pull_required, RemoteHead, StorageStrategy};

pub const MANIFEST_FILE: &str = "buckets.json";
const VERSION_FILE: &str = "B1";

/// Upper bound on the encoded size of one shard.
pub const DEFAULT_MAX_BUCKET_BYTES: usize = 2_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    #[serde(rename = "b", default)]
    buckets: Vec<String>,
    #[serde(rename = "u", default)]
    updated: i64,
    #[serde(rename = "v", default)]
    version: u32,
}

#[derive(Debug, Clone)]
pub struct BucketStorage<D> {
    driver: D,
    max_bucket_bytes: usize,
}

impl<D: StorageDriver> BucketStorage<D> {
    pub const fn new(driver: D) -> Self {
        Self {
            driver,
            max_bucket_bytes: DEFAULT_MAX_BUCKET_BYTES,
        }
    }

    #[must_use]
    pub fn with_max_bucket_bytes(mut self, max_bucket_bytes: usize) -> Self {
        self.max_bucket_bytes = max_bucket_bytes.max(1);
        self
    }

    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Shard names listed by the current manifest, if any.
    async fn current_buckets(&self) -> Result<Vec<String>> {
        let head = self.fetch_head().await?;
        let Some(info) = head.info else {
            return Ok(Vec::new());
        };
        match self.driver.pull_file(&info.providerid, &info.filename).await? {
            Some(blob) => match serde_json::from_str::<Manifest>(&blob) {
                Ok(manifest) => Ok(manifest.buckets),
                Err(error) => {
                    tracing::warn!(%error, "Ignoring unreadable bucket manifest");
                    Ok(Vec::new())
                }
            },
            None => Ok(Vec::new()),
        }
    }

    /// Pack items in order into shards no larger than the limit. An item
    /// bigger than the limit gets a shard of its own.
    fn pack<'a>(&self, items: &'a [CollectionItem]) -> Result<Vec<&'a [CollectionItem]>> {
        let mut shards = Vec::new();
        let mut start = 0;
        let mut size = 0;
        for (index, item) in items.iter().enumerate() {
            // +1 for the separating comma
            let len = codec::encoded_len(item)? + 1;
            if index > start && size + len > self.max_bucket_bytes {
                shards.push(&items[start..index]);
                start = index;
                size = 0;
            }
            size += len;
        }
        shards.push(&items[start..]);
        Ok(shards)
    }
}

fn bucket_name(index: usize) -> String {
    format!("bucket-{index}.json")
}

impl<D: StorageDriver> StorageStrategy for BucketStorage<D> {
    fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    fn is_configured(&self) -> bool {
        self.driver.is_configured()
    }

    async fn connect(&self) -> Result<RemoteHead> {
        connect_driver(&self.driver, MANIFEST_FILE, VERSION_FILE).await
    }

    async fn fetch_head(&self) -> Result<RemoteHead> {
        let files = self.driver.fetch_files_info(&[MANIFEST_FILE]).await?;
        Ok(RemoteHead::from_files(&files, MANIFEST_FILE))
    }

    async fn read_snapshot(&self, head: &DriverFileInfo) -> Result<Snapshot> {
        let manifest: Manifest = serde_json::from_str(&pull_required(&self.driver, head).await?)?;
        if manifest.version != MODEL_VERSION {
            tracing::warn!(
                found = manifest.version,
                expected = MODEL_VERSION,
                "Bucket manifest model version differs, decoding anyway"
            );
        }

        let mut items = Vec::new();
        for name in &manifest.buckets {
            let blob = self
                .driver
                .pull_file(name, name)
                .await?
                .ok_or_else(|| Error::Storage(format!("Bucket {name} listed but missing")))?;
            items.extend(codec::deserialize(&blob)?.items);
        }

        Ok(Snapshot {
            items,
            updated: manifest.updated,
            version: manifest.version,
        })
    }

    async fn write_snapshot(
        &self,
        items: &[CollectionItem],
        updated: i64,
    ) -> Result<DriverFileInfo> {
        let previous = self.current_buckets().await?;

        let shards = self.pack(items)?;
        let mut names = Vec::with_capacity(shards.len());
        for (index, shard) in shards.iter().enumerate() {
            let name = bucket_name(index);
            self.driver
                .push_file(&name, &codec::serialize(shard, updated)?)
                .await?;
            names.push(name);
        }

        let manifest = Manifest {
            buckets: names,
            updated,
            version: MODEL_VERSION,
        };
        let info = self
            .driver
            .push_file(MANIFEST_FILE, &serde_json::to_string(&manifest)?)
            .await?;

        for stale in previous.iter().filter(|name| !manifest.buckets.contains(name)) {
            if let Err(error) = self.driver.delete_file(stale, stale).await {
                tracing::warn!(bucket = %stale, %error, "Failed to delete stale bucket");
            }
        }

        tracing::debug!(
            driver = self.driver.name(),
            items = items.len(),
            buckets = manifest.buckets.len(),
            "Wrote bucketed snapshot"
        );
        Ok(info)
    }
}
