//! Storage drivers: dumb blob stores addressed by file name.
//!
//! A driver never merges anything. It lists descriptors, overwrites whole
//! files, and hands blobs back. Reachability problems are reported as
//! `connected: false` from [`StorageDriver::fetch_files_info`] so callers can
//! tell "offline" apart from real failures.

mod local_dir;
mod memory;
mod r2;
mod webdav;

use serde::{Deserialize, Serialize};

use crate::models::{DriverFileInfo, FilesInfo};
use crate::Result;

pub use local_dir::{LocalDirConfig, LocalDirDriver};
pub use memory::MemoryDriver;
pub use r2::{R2Config, R2Driver};
pub use webdav::{WebDavConfig, WebDavDriver};

/// Blob store contract shared by every backend.
#[allow(async_fn_in_trait)]
pub trait StorageDriver {
    type Config;

    /// Short backend name used in logs and errors.
    fn name(&self) -> &'static str;

    fn configure(&mut self, config: Self::Config) -> Result<()>;

    fn is_configured(&self) -> bool;

    /// Probe the remote for `filenames`. Absent files are left out of the
    /// result; an unreachable remote yields `connected: false`.
    async fn fetch_files_info(&self, filenames: &[&str]) -> Result<FilesInfo>;

    /// Overwrite `filename` with `content`.
    async fn push_file(&self, filename: &str, content: &str) -> Result<DriverFileInfo>;

    /// Fetch a blob; `None` when it does not exist.
    async fn pull_file(&self, providerid: &str, filename: &str) -> Result<Option<String>>;

    async fn delete_file(&self, providerid: &str, filename: &str) -> Result<()>;
}

/// Persisted driver configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DriverConfig {
    LocalDir(LocalDirConfig),
    #[serde(rename = "webdav")]
    WebDav(WebDavConfig),
    R2(R2Config),
}

impl DriverConfig {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LocalDir(_) => "local_dir",
            Self::WebDav(_) => "webdav",
            Self::R2(_) => "r2",
        }
    }

    /// One-line description without secrets, for listings.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::LocalDir(config) => config.path.display().to_string(),
            Self::WebDav(config) => config.url.clone(),
            Self::R2(config) => format!("{}/{}", config.bucket, config.prefix),
        }
    }
}

/// Driver selected at runtime from configuration.
#[derive(Clone, Debug)]
pub enum AnyDriver {
    Memory(MemoryDriver),
    LocalDir(LocalDirDriver),
    WebDav(WebDavDriver),
    R2(R2Driver),
}

impl AnyDriver {
    pub fn from_config(config: DriverConfig) -> Result<Self> {
        Ok(match config {
            DriverConfig::LocalDir(config) => {
                let mut driver = LocalDirDriver::default();
                driver.configure(config)?;
                Self::LocalDir(driver)
            }
            DriverConfig::WebDav(config) => {
                let mut driver = WebDavDriver::default();
                driver.configure(config)?;
                Self::WebDav(driver)
            }
            DriverConfig::R2(config) => {
                let mut driver = R2Driver::default();
                driver.configure(config)?;
                Self::R2(driver)
            }
        })
    }
}

impl From<MemoryDriver> for AnyDriver {
    fn from(driver: MemoryDriver) -> Self {
        Self::Memory(driver)
    }
}

impl StorageDriver for AnyDriver {
    type Config = DriverConfig;

    fn name(&self) -> &'static str {
        match self {
            Self::Memory(driver) => driver.name(),
            Self::LocalDir(driver) => driver.name(),
            Self::WebDav(driver) => driver.name(),
            Self::R2(driver) => driver.name(),
        }
    }

    fn configure(&mut self, config: DriverConfig) -> Result<()> {
        *self = Self::from_config(config)?;
        Ok(())
    }

    fn is_configured(&self) -> bool {
        match self {
            Self::Memory(driver) => driver.is_configured(),
            Self::LocalDir(driver) => driver.is_configured(),
            Self::WebDav(driver) => driver.is_configured(),
            Self::R2(driver) => driver.is_configured(),
        }
    }

    async fn fetch_files_info(&self, filenames: &[&str]) -> Result<FilesInfo> {
        match self {
            Self::Memory(driver) => driver.fetch_files_info(filenames).await,
            Self::LocalDir(driver) => driver.fetch_files_info(filenames).await,
            Self::WebDav(driver) => driver.fetch_files_info(filenames).await,
            Self::R2(driver) => driver.fetch_files_info(filenames).await,
        }
    }

    async fn push_file(&self, filename: &str, content: &str) -> Result<DriverFileInfo> {
        match self {
            Self::Memory(driver) => driver.push_file(filename, content).await,
            Self::LocalDir(driver) => driver.push_file(filename, content).await,
            Self::WebDav(driver) => driver.push_file(filename, content).await,
            Self::R2(driver) => driver.push_file(filename, content).await,
        }
    }

    async fn pull_file(&self, providerid: &str, filename: &str) -> Result<Option<String>> {
        match self {
            Self::Memory(driver) => driver.pull_file(providerid, filename).await,
            Self::LocalDir(driver) => driver.pull_file(providerid, filename).await,
            Self::WebDav(driver) => driver.pull_file(providerid, filename).await,
            Self::R2(driver) => driver.pull_file(providerid, filename).await,
        }
    }

    async fn delete_file(&self, providerid: &str, filename: &str) -> Result<()> {
        match self {
            Self::Memory(driver) => driver.delete_file(providerid, filename).await,
            Self::LocalDir(driver) => driver.delete_file(providerid, filename).await,
            Self::WebDav(driver) => driver.delete_file(providerid, filename).await,
            Self::R2(driver) => driver.delete_file(providerid, filename).await,
        }
    }
}

/// Reject names that could escape the remote's namespace.
pub(crate) fn validate_filename(filename: &str) -> Result<&str> {
    let filename = filename.trim();
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename == "."
        || filename == ".."
    {
        return Err(crate::Error::InvalidInput(format!(
            "Invalid remote file name: '{filename}'"
        )));
    }
    Ok(filename)
}
