//! Whole collection in one `collection.json`.

use crate::codec::{self, Snapshot};
use crate::drivers::StorageDriver;
use crate::models::{CollectionItem, DriverFileInfo};
use crate::Result;

use super::{connect_driver, pull_required, RemoteHead, StorageStrategy};

pub const COLLECTION_FILE: &str = "collection.json";
const VERSION_FILE: &str = "S1";

#[derive(Debug, Clone)]
pub struct SingleFileStorage<D> {
    driver: D,
}

impl<D: StorageDriver> SingleFileStorage<D> {
    pub const fn new(driver: D) -> Self {
        Self { driver }
    }

    pub const fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: StorageDriver> StorageStrategy for SingleFileStorage<D> {
    fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    fn is_configured(&self) -> bool {
        self.driver.is_configured()
    }

    async fn connect(&self) -> Result<RemoteHead> {
        connect_driver(&self.driver, COLLECTION_FILE, VERSION_FILE).await
    }

    async fn fetch_head(&self) -> Result<RemoteHead> {
        let files = self.driver.fetch_files_info(&[COLLECTION_FILE]).await?;
        Ok(RemoteHead::from_files(&files, COLLECTION_FILE))
    }

    async fn read_snapshot(&self, head: &DriverFileInfo) -> Result<Snapshot> {
        let blob = pull_required(&self.driver, head).await?;
        codec::deserialize(&blob)
    }

    async fn write_snapshot(
        &self,
        items: &[CollectionItem],
        updated: i64,
    ) -> Result<DriverFileInfo> {
        let blob = codec::serialize(items, updated)?;
        let info = self.driver.push_file(COLLECTION_FILE, &blob).await?;
        tracing::debug!(
            driver = self.driver.name(),
            items = items.len(),
            bytes = blob.len(),
            "Wrote snapshot"
        );
        Ok(info)
    }
}
