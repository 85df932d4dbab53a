//! In-memory driver used by tests and simulations.
//!
//! Clones share one remote, so two `MemoryDriver`s cloned from each other
//! behave like two devices talking to the same bucket.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{DriverFileInfo, FilesInfo};
use crate::util::{content_hash, now_ms};
use crate::{Error, Result};

use super::{validate_filename, StorageDriver};

#[derive(Debug)]
struct MemoryRemote {
    files: Mutex<HashMap<String, (String, DriverFileInfo)>>,
    online: AtomicBool,
    last_revision: AtomicI64,
    pushes: AtomicUsize,
    pulls: AtomicUsize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            last_revision: AtomicI64::new(0),
            pushes: AtomicUsize::new(0),
            pulls: AtomicUsize::new(0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MemoryDriver {
    remote: Arc<MemoryRemote>,
    configured: bool,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// A configured driver with an empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self {
            remote: Arc::default(),
            configured: true,
        }
    }

    /// A driver that fails every call until configured.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Simulate losing or regaining connectivity for every clone.
    pub fn set_online(&self, online: bool) {
        self.remote.online.store(online, Ordering::SeqCst);
    }

    /// Current content of a remote file.
    #[must_use]
    pub fn file(&self, filename: &str) -> Option<String> {
        self.lock()
            .ok()?
            .get(filename)
            .map(|(content, _)| content.clone())
    }

    /// Sorted names of all remote files.
    #[must_use]
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Number of successful `push_file` calls across all clones.
    #[must_use]
    pub fn push_count(&self) -> usize {
        self.remote.pushes.load(Ordering::SeqCst)
    }

    /// Number of `pull_file` calls across all clones.
    #[must_use]
    pub fn pull_count(&self) -> usize {
        self.remote.pulls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, (String, DriverFileInfo)>>> {
        self.remote
            .files
            .lock()
            .map_err(|_| Error::Storage("Memory remote lock poisoned".to_string()))
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.configured {
            return Err(Error::NotConfigured(self.name().to_string()));
        }
        if !self.remote.online.load(Ordering::SeqCst) {
            return Err(Error::Storage("Memory remote is offline".to_string()));
        }
        Ok(())
    }

    /// Strictly increasing revision stamp, close to wall-clock time.
    fn next_revision(&self) -> i64 {
        let now = now_ms();
        let previous = self
            .remote
            .last_revision
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

impl StorageDriver for MemoryDriver {
    type Config = ();

    fn name(&self) -> &'static str {
        "memory"
    }

    fn configure(&mut self, (): ()) -> Result<()> {
        self.configured = true;
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch_files_info(&self, filenames: &[&str]) -> Result<FilesInfo> {
        if !self.configured {
            return Err(Error::NotConfigured(self.name().to_string()));
        }
        if !self.remote.online.load(Ordering::SeqCst) {
            tracing::warn!(driver = self.name(), "Remote unreachable");
            return Ok(FilesInfo::offline());
        }

        let files = self.lock()?;
        Ok(FilesInfo {
            connected: true,
            files: filenames
                .iter()
                .filter_map(|name| files.get(*name).map(|(_, info)| info.clone()))
                .collect(),
        })
    }

    async fn push_file(&self, filename: &str, content: &str) -> Result<DriverFileInfo> {
        self.ensure_ready()?;
        let filename = validate_filename(filename)?;

        let info = DriverFileInfo {
            providerid: format!("memory:{filename}"),
            filename: filename.to_string(),
            updated: self.next_revision(),
            hash: Some(content_hash(content.as_bytes())),
            size: Some(content.len() as u64),
        };
        self.lock()?
            .insert(filename.to_string(), (content.to_string(), info.clone()));
        self.remote.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(info)
    }

    async fn pull_file(&self, _providerid: &str, filename: &str) -> Result<Option<String>> {
        self.ensure_ready()?;
        self.remote.pulls.fetch_add(1, Ordering::SeqCst);
        Ok(self.file(filename))
    }

    async fn delete_file(&self, _providerid: &str, filename: &str) -> Result<()> {
        self.ensure_ready()?;
        self.lock()?.remove(filename);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn clones_share_one_remote() {
        let device_a = MemoryDriver::new();
        let device_b = device_a.clone();

        device_a.push_file("x.json", "hello").await.unwrap();

        assert_eq!(
            device_b.pull_file("", "x.json").await.unwrap().as_deref(),
            Some("hello")
        );
        assert_eq!(device_b.pull_file("", "y.json").await.unwrap(), None);
    }

    #[tokio::test]
    async fn revisions_strictly_increase() {
        let driver = MemoryDriver::new();
        let first = driver.push_file("x.json", "1").await.unwrap();
        let second = driver.push_file("x.json", "2").await.unwrap();
        let third = driver.push_file("y.json", "3").await.unwrap();

        assert!(second.updated > first.updated);
        assert!(third.updated > second.updated);
        assert_eq!(driver.push_count(), 3);
    }

    #[tokio::test]
    async fn offline_remote_reports_disconnected() {
        let driver = MemoryDriver::new();
        driver.push_file("x.json", "1").await.unwrap();
        driver.set_online(false);

        let info = driver.fetch_files_info(&["x.json"]).await.unwrap();
        assert!(!info.connected);
        assert!(info.files.is_empty());
        assert!(driver.push_file("x.json", "2").await.is_err());
    }

    #[tokio::test]
    async fn unconfigured_driver_fails_fast() {
        let mut driver = MemoryDriver::unconfigured();
        assert!(matches!(
            driver.fetch_files_info(&["x.json"]).await,
            Err(Error::NotConfigured(_))
        ));

        driver.configure(()).unwrap();
        assert!(driver.fetch_files_info(&["x.json"]).await.unwrap().connected);
    }

    #[tokio::test]
    async fn delete_removes_file() {
        let driver = MemoryDriver::new();
        driver.push_file("x.json", "1").await.unwrap();
        driver.delete_file("", "x.json").await.unwrap();
        assert!(driver.file_names().is_empty());
    }
}
