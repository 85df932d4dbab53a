//! Remote configuration shared by every Quire front end.
//!
//! Only driver settings live here. The per-remote sync cursors are device
//! state and are stored with the workspace.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::drivers::{AnyDriver, DriverConfig};
use crate::models::RemoteInfo;
use crate::strategy::{AnyStrategy, StrategyKind};
use crate::sync::SyncService;
use crate::util::is_http_url;
use crate::{Error, Result};

pub const SETTINGS_FILE_NAME: &str = "remotes.json";

const SETTINGS_VERSION: u32 = 1;

/// One named remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    pub name: String,
    #[serde(default)]
    pub strategy: StrategyKind,
    pub driver: DriverConfig,
}

/// Persisted remote list. The first remote is the primary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncSettings {
    #[serde(default = "default_settings_version")]
    pub version: u32,
    #[serde(default)]
    pub remotes: Vec<RemoteConfig>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            remotes: Vec::new(),
        }
    }
}

const fn default_settings_version() -> u32 {
    SETTINGS_VERSION
}

impl SyncSettings {
    /// Load settings, treating a missing file as an empty remote list.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut settings = serde_json::from_str::<Self>(&raw)?;
        settings.normalize();
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        normalized.validate()?;
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    #[must_use]
    pub fn remote(&self, name: &str) -> Option<&RemoteConfig> {
        self.remotes.iter().find(|remote| remote.name == name.trim())
    }

    pub fn add_remote(&mut self, mut remote: RemoteConfig) -> Result<()> {
        remote.normalize();
        if self.remote(&remote.name).is_some() {
            return Err(Error::InvalidInput(format!(
                "Remote '{}' already exists",
                remote.name
            )));
        }
        remote.validate()?;
        self.remotes.push(remote);
        Ok(())
    }

    pub fn remove_remote(&mut self, name: &str) -> Result<RemoteConfig> {
        let index = self
            .remotes
            .iter()
            .position(|remote| remote.name == name.trim())
            .ok_or_else(|| Error::NotFound(format!("remote '{}'", name.trim())))?;
        Ok(self.remotes.remove(index))
    }

    /// Build a service over every configured remote, seeding each with its
    /// cached info when one is known.
    pub fn build_service(
        &self,
        cached: &BTreeMap<String, RemoteInfo>,
    ) -> Result<SyncService<AnyStrategy<AnyDriver>>> {
        let mut service = SyncService::new();
        for remote in &self.remotes {
            let driver = AnyDriver::from_config(remote.driver.clone())?;
            let info = cached.get(&remote.name).cloned().unwrap_or_default();
            service.add_remote(
                remote.name.clone(),
                AnyStrategy::new(remote.strategy, driver),
                info,
            )?;
        }
        Ok(service)
    }

    fn normalize(&mut self) {
        for remote in &mut self.remotes {
            remote.normalize();
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for remote in &self.remotes {
            remote.validate()?;
            if !seen.insert(remote.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "Duplicate remote name '{}'",
                    remote.name
                )));
            }
        }
        Ok(())
    }
}

impl RemoteConfig {
    fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        match &mut self.driver {
            DriverConfig::WebDav(config) => {
                config.url = config.url.trim().trim_end_matches('/').to_string();
                config.username = config.username.trim().to_string();
                config.folder = config.folder.trim().trim_matches('/').to_string();
            }
            DriverConfig::R2(config) => {
                config.prefix = config.prefix.trim().trim_matches('/').to_string();
            }
            DriverConfig::LocalDir(_) => {}
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::InvalidInput("Remote name is required".to_string()));
        }
        if let DriverConfig::WebDav(config) = &self.driver {
            if !is_http_url(&config.url) {
                return Err(Error::InvalidInput(format!(
                    "WebDAV URL for '{}' must start with http:// or https://",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
