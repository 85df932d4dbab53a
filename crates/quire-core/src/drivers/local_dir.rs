//! Driver backed by a plain directory, e.g. a folder synced by another tool
//! or a mounted network share.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::models::{DriverFileInfo, FilesInfo};
use crate::util::{content_hash, now_ms};
use crate::{Error, Result};

use super::{validate_filename, StorageDriver};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalDirConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug, Default)]
pub struct LocalDirDriver {
    root: Option<PathBuf>,
}

impl LocalDirDriver {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(path.into()),
        }
    }

    fn root(&self) -> Result<&Path> {
        self.root
            .as_deref()
            .ok_or_else(|| Error::NotConfigured(self.name().to_string()))
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf> {
        Ok(self.root()?.join(validate_filename(filename)?))
    }

    async fn describe(&self, filename: &str) -> Result<Option<DriverFileInfo>> {
        let path = self.path_for(filename)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        Ok(Some(DriverFileInfo {
            providerid: path.display().to_string(),
            filename: filename.to_string(),
            updated: metadata.modified().map_or_else(|_| now_ms(), system_time_ms),
            hash: None,
            size: Some(metadata.len()),
        }))
    }
}

impl StorageDriver for LocalDirDriver {
    type Config = LocalDirConfig;

    fn name(&self) -> &'static str {
        "local_dir"
    }

    fn configure(&mut self, config: LocalDirConfig) -> Result<()> {
        if config.path.as_os_str().is_empty() {
            return Err(Error::InvalidInput(
                "Local directory path cannot be empty".to_string(),
            ));
        }
        self.root = Some(config.path);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.root.is_some()
    }

    async fn fetch_files_info(&self, filenames: &[&str]) -> Result<FilesInfo> {
        let root = self.root()?;
        if let Err(error) = tokio::fs::create_dir_all(root).await {
            tracing::warn!(driver = self.name(), path = %root.display(), %error, "Remote unreachable");
            return Ok(FilesInfo::offline());
        }

        let mut files = Vec::new();
        for filename in filenames {
            if let Some(info) = self.describe(filename).await? {
                files.push(info);
            }
        }
        Ok(FilesInfo {
            connected: true,
            files,
        })
    }

    async fn push_file(&self, filename: &str, content: &str) -> Result<DriverFileInfo> {
        let path = self.path_for(filename)?;
        tokio::fs::create_dir_all(self.root()?).await?;
        let previous = self.describe(filename).await?.map(|info| info.updated);

        // Write beside the target and rename so readers never see a torn file.
        let staging = path.with_extension("partial");
        tokio::fs::write(&staging, content).await?;
        tokio::fs::rename(&staging, &path).await?;

        let mut info = self
            .describe(filename)
            .await?
            .ok_or_else(|| Error::Storage(format!("{} vanished after write", path.display())))?;

        // Coarse mtimes could repeat a revision; keep them strictly increasing.
        if let Some(previous) = previous.filter(|previous| info.updated <= *previous) {
            info.updated = previous + 1;
            set_modified_ms(&path, info.updated).await?;
        }
        info.hash = Some(content_hash(content.as_bytes()));
        Ok(info)
    }

    async fn pull_file(&self, _providerid: &str, filename: &str) -> Result<Option<String>> {
        let path = self.path_for(filename)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn delete_file(&self, _providerid: &str, filename: &str) -> Result<()> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Err(error) if error.kind() != std::io::ErrorKind::NotFound => Err(error.into()),
            _ => Ok(()),
        }
    }
}

fn system_time_ms(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |duration| i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
}

async fn set_modified_ms(path: &Path, updated: i64) -> Result<()> {
    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .open(path)
        .await?
        .into_std()
        .await;
    let time = UNIX_EPOCH + Duration::from_millis(u64::try_from(updated).unwrap_or(0));
    tokio::task::spawn_blocking(move || file.set_modified(time))
        .await
        .map_err(|error| Error::Storage(format!("Failed to stamp revision: {error}")))??;
    Ok(())
}
