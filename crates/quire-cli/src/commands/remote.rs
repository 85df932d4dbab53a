use std::path::Path;

use quire_core::config::{RemoteConfig, SyncSettings};
use quire_core::drivers::{DriverConfig, LocalDirConfig, R2Config, WebDavConfig};
use serde::Serialize;

use crate::cli::{DriverCommands, RemoteCommands};
use crate::commands::common::{format_timestamp, LocalState};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct RemoteListItem {
    pub name: String,
    pub primary: bool,
    pub strategy: String,
    pub driver: String,
    pub location: String,
    pub connected: bool,
    pub last_pulled: i64,
}

pub fn run_remote(
    command: RemoteCommands,
    settings_path: &Path,
    workspace_path: &Path,
) -> Result<(), CliError> {
    match command {
        RemoteCommands::Add {
            name,
            strategy,
            driver,
        } => {
            let mut settings = SyncSettings::load_from_path(settings_path)?;
            let remote = RemoteConfig {
                name,
                strategy: strategy.into(),
                driver: driver_config(driver)?,
            };
            let label = format!("{} ({})", remote.driver.describe(), remote.driver.kind());
            settings.add_remote(remote)?;
            settings.save_to_path(settings_path)?;
            let name = settings
                .remotes
                .last()
                .map(|remote| remote.name.clone())
                .unwrap_or_default();
            println!("Added remote '{name}' at {label}");
            Ok(())
        }
        RemoteCommands::List { json } => {
            let settings = SyncSettings::load_from_path(settings_path)?;
            let state = LocalState::load(workspace_path)?;
            let items = remote_list_items(&settings, &state);

            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else if items.is_empty() {
                println!("No remotes configured.");
            } else {
                for line in format_remote_lines(&items) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        RemoteCommands::Remove { name } => {
            let mut settings = SyncSettings::load_from_path(settings_path)?;
            let removed = settings.remove_remote(&name)?;
            settings.save_to_path(settings_path)?;

            let mut state = LocalState::load(workspace_path)?;
            if state.remotes.remove(&removed.name).is_some() {
                state.save(workspace_path)?;
            }
            println!("Removed remote '{}'", removed.name);
            Ok(())
        }
    }
}

pub fn driver_config(command: DriverCommands) -> Result<DriverConfig, CliError> {
    match command {
        DriverCommands::Dir { path } => Ok(DriverConfig::LocalDir(LocalDirConfig { path })),
        DriverCommands::Webdav {
            url,
            username,
            password,
            folder,
        } => Ok(DriverConfig::WebDav(WebDavConfig {
            url,
            username,
            password,
            folder,
        })),
        DriverCommands::R2 {
            from_env,
            account_id,
            bucket,
            access_key_id,
            secret_access_key,
            prefix,
        } => {
            if from_env {
                return R2Config::from_env()?.map(DriverConfig::R2).ok_or_else(|| {
                    CliError::Config(
                        "R2 is not configured in the environment. Set R2_ACCOUNT_ID, R2_BUCKET, R2_ACCESS_KEY_ID, and R2_SECRET_ACCESS_KEY."
                            .to_string(),
                    )
                });
            }

            let mut missing = Vec::new();
            for (flag, value) in [
                ("--account-id", &account_id),
                ("--bucket", &bucket),
                ("--access-key-id", &access_key_id),
                ("--secret-access-key", &secret_access_key),
            ] {
                if value.as_deref().map_or(true, |value| value.trim().is_empty()) {
                    missing.push(flag);
                }
            }
            if !missing.is_empty() {
                return Err(CliError::Config(format!(
                    "R2 remote is missing {} (or pass --from-env)",
                    missing.join(", ")
                )));
            }

            Ok(DriverConfig::R2(R2Config {
                account_id: account_id.unwrap_or_default().trim().to_string(),
                bucket: bucket.unwrap_or_default().trim().to_string(),
                access_key_id: access_key_id.unwrap_or_default().trim().to_string(),
                secret_access_key: secret_access_key.unwrap_or_default().trim().to_string(),
                prefix,
            }))
        }
    }
}

pub fn remote_list_items(settings: &SyncSettings, state: &LocalState) -> Vec<RemoteListItem> {
    settings
        .remotes
        .iter()
        .enumerate()
        .map(|(index, remote)| {
            let info = state.remotes.get(&remote.name);
            RemoteListItem {
                name: remote.name.clone(),
                primary: index == 0,
                strategy: remote.strategy.to_string(),
                driver: remote.driver.kind().to_string(),
                location: remote.driver.describe(),
                connected: info.is_some_and(|info| info.connected),
                last_pulled: info.map_or(0, |info| info.last_pulled),
            }
        })
        .collect()
}

pub fn format_remote_lines(items: &[RemoteListItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let marker = if item.primary { '*' } else { ' ' };
            let pulled = if item.last_pulled > 0 {
                format!("pulled {}", format_timestamp(item.last_pulled))
            } else {
                "never pulled".to_string()
            };
            format!(
                "{marker} {:<12}  {:<9}  {:<6}  {}  ({pulled})",
                item.name, item.driver, item.strategy, item.location
            )
        })
        .collect()
}
