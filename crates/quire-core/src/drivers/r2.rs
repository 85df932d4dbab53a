//! Cloudflare R2 (S3-compatible) driver.

use std::env;

use aws_credential_types::Credentials;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::{HeadObjectError, HeadObjectOutput};
use aws_sdk_s3::{primitives::ByteStream, Client};
use aws_types::region::Region;
use serde::{Deserialize, Serialize};

use crate::models::{DriverFileInfo, FilesInfo};
use crate::util::{content_hash, now_ms};
use crate::{Error, Result};

use super::{validate_filename, StorageDriver};

const ENV_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
const ENV_BUCKET: &str = "R2_BUCKET";
const ENV_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
const ENV_PREFIX: &str = "R2_PREFIX";

/// Cloudflare R2 configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct R2Config {
    /// Cloudflare account identifier.
    pub account_id: String,
    /// R2 bucket name.
    pub bucket: String,
    /// Access key id for S3-compatible auth.
    pub access_key_id: String,
    /// Secret access key for S3-compatible auth.
    pub secret_access_key: String,
    /// Key prefix that namespaces this collection inside the bucket.
    #[serde(default)]
    pub prefix: String,
}

impl R2Config {
    /// Load R2 configuration from environment variables.
    ///
    /// Returns `Ok(None)` when no R2 variables are set.
    /// Returns an error when only a partial configuration is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    /// Cloudflare R2 S3-compatible endpoint URL.
    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }

    /// Object key for a remote file name.
    #[must_use]
    pub fn object_key(&self, filename: &str) -> String {
        let prefix = self.prefix.trim().trim_matches('/');
        if prefix.is_empty() {
            filename.to_string()
        } else {
            format!("{prefix}/{filename}")
        }
    }
}

/// R2-backed storage driver.
#[derive(Clone, Debug, Default)]
pub struct R2Driver {
    config: Option<R2Config>,
    client: Option<Client>,
}

impl R2Driver {
    #[must_use]
    pub fn new(config: R2Config) -> Self {
        let client = build_s3_client(&config);
        Self {
            config: Some(config),
            client: Some(client),
        }
    }

    fn ready(&self) -> Result<(&R2Config, &Client)> {
        match (&self.config, &self.client) {
            (Some(config), Some(client)) => Ok((config, client)),
            _ => Err(Error::NotConfigured(self.name().to_string())),
        }
    }

    fn object_key(&self, filename: &str) -> Result<String> {
        let (config, _) = self.ready()?;
        Ok(config.object_key(validate_filename(filename)?))
    }

    async fn head(&self, filename: &str) -> Result<Option<DriverFileInfo>> {
        let (config, client) = self.ready()?;
        let key = self.object_key(filename)?;
        match client
            .head_object()
            .bucket(&config.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => Ok(Some(describe_head(&output, key, filename))),
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(HeadObjectError::is_not_found) =>
            {
                Ok(None)
            }
            Err(error) => Err(storage_error(
                "head_object",
                &config.bucket,
                Some(&key),
                error,
            )),
        }
    }
}

impl StorageDriver for R2Driver {
    type Config = R2Config;

    fn name(&self) -> &'static str {
        "r2"
    }

    fn configure(&mut self, config: R2Config) -> Result<()> {
        let missing = missing_fields(&config);
        if !missing.is_empty() {
            return Err(Error::InvalidInput(format!(
                "R2 configuration is incomplete. Missing: {}",
                missing.join(", ")
            )));
        }
        *self = Self::new(config);
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.config.is_some() && self.client.is_some()
    }

    async fn fetch_files_info(&self, filenames: &[&str]) -> Result<FilesInfo> {
        self.ready()?;
        let mut files = Vec::new();
        for filename in filenames {
            match self.head(filename).await {
                Ok(Some(info)) => files.push(info),
                Ok(None) => {}
                Err(error @ Error::Storage(_)) => {
                    tracing::warn!(driver = self.name(), %error, "Remote unreachable");
                    return Ok(FilesInfo::offline());
                }
                Err(error) => return Err(error),
            }
        }
        Ok(FilesInfo {
            connected: true,
            files,
        })
    }

    async fn push_file(&self, filename: &str, content: &str) -> Result<DriverFileInfo> {
        let (config, client) = self.ready()?;
        let key = self.object_key(filename)?;

        client
            .put_object()
            .bucket(&config.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(content.as_bytes().to_vec()))
            .send()
            .await
            .map_err(|error| storage_error("put_object", &config.bucket, Some(&key), error))?;

        let mut info = self
            .head(filename)
            .await?
            .unwrap_or_else(|| DriverFileInfo {
                providerid: key,
                filename: filename.to_string(),
                updated: now_ms(),
                hash: None,
                size: None,
            });
        info.hash = Some(content_hash(content.as_bytes()));
        info.size = Some(content.len() as u64);
        Ok(info)
    }

    async fn pull_file(&self, _providerid: &str, filename: &str) -> Result<Option<String>> {
        let (config, client) = self.ready()?;
        let key = self.object_key(filename)?;

        let response = match client
            .get_object()
            .bucket(&config.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key) =>
            {
                return Ok(None);
            }
            Err(error) => {
                return Err(storage_error(
                    "get_object",
                    &config.bucket,
                    Some(&key),
                    error,
                ));
            }
        };

        let payload = response.body.collect().await.map_err(|error| {
            storage_error("get_object_body", &config.bucket, Some(&key), error)
        })?;
        String::from_utf8(payload.into_bytes().to_vec())
            .map(Some)
            .map_err(|error| Error::Storage(format!("R2 object {key} is not UTF-8: {error}")))
    }

    async fn delete_file(&self, _providerid: &str, filename: &str) -> Result<()> {
        let (config, client) = self.ready()?;
        let key = self.object_key(filename)?;

        client
            .delete_object()
            .bucket(&config.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|error| storage_error("delete_object", &config.bucket, Some(&key), error))?;
        Ok(())
    }
}

fn describe_head(output: &HeadObjectOutput, key: String, filename: &str) -> DriverFileInfo {
    DriverFileInfo {
        providerid: key,
        filename: filename.to_string(),
        updated: output
            .last_modified()
            .and_then(|modified| modified.to_millis().ok())
            .unwrap_or_else(now_ms),
        hash: output
            .e_tag()
            .map(|etag| etag.trim_matches('"').to_string()),
        size: output
            .content_length()
            .and_then(|len| u64::try_from(len).ok()),
    }
}

fn missing_fields(config: &R2Config) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if config.account_id.trim().is_empty() {
        missing.push(ENV_ACCOUNT_ID);
    }
    if config.bucket.trim().is_empty() {
        missing.push(ENV_BUCKET);
    }
    if config.access_key_id.trim().is_empty() {
        missing.push(ENV_ACCESS_KEY_ID);
    }
    if config.secret_access_key.trim().is_empty() {
        missing.push(ENV_SECRET_ACCESS_KEY);
    }
    missing
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<R2Config>> {
    let value = |key| lookup(key).map(|value| value.trim().to_string());
    let account_id = value(ENV_ACCOUNT_ID);
    let bucket = value(ENV_BUCKET);
    let access_key_id = value(ENV_ACCESS_KEY_ID);
    let secret_access_key = value(ENV_SECRET_ACCESS_KEY);
    let prefix = value(ENV_PREFIX);

    let any_present = account_id.is_some()
        || bucket.is_some()
        || access_key_id.is_some()
        || secret_access_key.is_some()
        || prefix.is_some();

    if !any_present {
        return Ok(None);
    }

    let config = R2Config {
        account_id: account_id.unwrap_or_default(),
        bucket: bucket.unwrap_or_default(),
        access_key_id: access_key_id.unwrap_or_default(),
        secret_access_key: secret_access_key.unwrap_or_default(),
        prefix: prefix.unwrap_or_default().trim_matches('/').to_string(),
    };

    let missing = missing_fields(&config);
    if !missing.is_empty() {
        return Err(Error::InvalidInput(format!(
            "R2 configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    }

    Ok(Some(config))
}

fn build_s3_client(config: &R2Config) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "quire-core-r2-driver",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn storage_error(
    operation: &str,
    bucket: &str,
    object_key: Option<&str>,
    error: impl std::fmt::Display,
) -> Error {
    let target = object_key.map_or_else(|| bucket.to_string(), |key| format!("{bucket}/{key}"));
    Error::Storage(format!("R2 {operation} failed for {target}: {error}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<Option<R2Config>> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    fn full_map() -> HashMap<&'static str, &'static str> {
        let mut map = HashMap::new();
        map.insert(ENV_ACCOUNT_ID, "account-1");
        map.insert(ENV_BUCKET, "bucket-a");
        map.insert(ENV_ACCESS_KEY_ID, "AKID123");
        map.insert(ENV_SECRET_ACCESS_KEY, "SECRET123");
        map
    }

    #[test]
    fn parse_config_none_returns_none() {
        let map = HashMap::new();
        assert!(parse_from_map(&map).unwrap().is_none());
    }

    #[test]
    fn parse_config_requires_all_required_values() {
        let mut map = HashMap::new();
        map.insert(ENV_ACCOUNT_ID, "account");
        map.insert(ENV_BUCKET, "bucket");

        let err = parse_from_map(&map).unwrap_err();
        match err {
            Error::InvalidInput(message) => {
                assert!(message.contains(ENV_ACCESS_KEY_ID));
                assert!(message.contains(ENV_SECRET_ACCESS_KEY));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_config_prefix_alone_is_incomplete() {
        let mut map = HashMap::new();
        map.insert(ENV_PREFIX, "notes");
        assert!(parse_from_map(&map).is_err());
    }

    #[test]
    fn parse_config_accepts_valid_values_and_normalizes_prefix() {
        let mut map = full_map();
        map.insert(ENV_PREFIX, "/devices/laptop/");

        let config = parse_from_map(&map).unwrap().unwrap();
        assert_eq!(config.prefix, "devices/laptop");
        assert_eq!(
            config.endpoint_url(),
            "https://account-1.r2.cloudflarestorage.com"
        );
        assert_eq!(
            config.object_key("collection.json"),
            "devices/laptop/collection.json"
        );
    }

    #[test]
    fn object_key_without_prefix_is_file_name() {
        let config = parse_from_map(&full_map()).unwrap().unwrap();
        assert_eq!(config.object_key("S1"), "S1");
    }

    #[test]
    fn configure_rejects_blank_credentials() {
        let mut config = parse_from_map(&full_map()).unwrap().unwrap();
        config.secret_access_key = "  ".to_string();

        let mut driver = R2Driver::default();
        let err = driver.configure(config).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(message) if message.contains(ENV_SECRET_ACCESS_KEY)));
        assert!(!driver.is_configured());
    }

    #[test]
    fn driver_rejects_unsafe_file_names() {
        let driver = R2Driver::new(parse_from_map(&full_map()).unwrap().unwrap());
        assert!(driver.object_key("../escape").is_err());
    }

    #[test]
    #[ignore = "Requires local R2 env vars in process environment or .env"]
    fn from_env_loads_real_r2_config() {
        let _ = dotenvy::dotenv();

        let config = R2Config::from_env()
            .expect("R2 env parsing should not error")
            .expect("R2 config should be present");

        assert!(!config.account_id.trim().is_empty());
        assert!(!config.bucket.trim().is_empty());
        assert_eq!(
            config.endpoint_url(),
            format!("https://{}.r2.cloudflarestorage.com", config.account_id)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires local R2 env vars plus network access"]
    async fn r2_file_roundtrip_push_pull_delete() {
        let _ = dotenvy::dotenv();

        let mut config = R2Config::from_env()
            .expect("R2 env parsing should not error")
            .expect("R2 config should be present");
        config.prefix = format!("quire-it/{}", uuid::Uuid::now_v7());
        let driver = R2Driver::new(config);

        let pushed = driver
            .push_file("roundtrip.json", "{\"i\":[]}")
            .await
            .unwrap_or_else(|error| panic!("R2 push failed: {error}"));
        let info = driver.fetch_files_info(&["roundtrip.json"]).await.unwrap();
        assert!(info.connected);
        assert_eq!(info.files.len(), 1);

        let content = driver
            .pull_file(&pushed.providerid, "roundtrip.json")
            .await
            .unwrap();
        assert_eq!(content.as_deref(), Some("{\"i\":[]}"));

        driver
            .delete_file(&pushed.providerid, "roundtrip.json")
            .await
            .unwrap();
        assert_eq!(
            driver.pull_file(&pushed.providerid, "roundtrip.json").await.unwrap(),
            None
        );
    }
}
