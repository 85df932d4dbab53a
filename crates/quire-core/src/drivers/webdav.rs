//! WebDAV driver (Nextcloud, ownCloud, Apache `mod_dav`, ...).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::models::{DriverFileInfo, FilesInfo};
use crate::util::{compact_text, content_hash, is_http_url, now_ms};
use crate::{Error, Result};

use super::{validate_filename, StorageDriver};

const DEFAULT_FOLDER: &str = "quire";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebDavConfig {
    /// Server collection URL, e.g. `https://cloud.example.com/remote.php/dav/files/ana`
    pub url: String,
    pub username: String,
    pub password: String,
    /// Folder below `url` that holds the remote files
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String {
    DEFAULT_FOLDER.to_string()
}

impl WebDavConfig {
    /// URL of the folder holding the remote files, with a trailing slash.
    #[must_use]
    pub fn folder_url(&self) -> String {
        let base = self.url.trim().trim_end_matches('/');
        let folder = self.folder.trim().trim_matches('/');
        if folder.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{}/", urlencoding::encode(folder))
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct WebDavDriver {
    config: Option<WebDavConfig>,
    client: reqwest::Client,
    folder_ready: Arc<AtomicBool>,
}

impl WebDavDriver {
    fn config(&self) -> Result<&WebDavConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| Error::NotConfigured(self.name().to_string()))
    }

    fn file_url(&self, filename: &str) -> Result<String> {
        let filename = validate_filename(filename)?;
        Ok(format!(
            "{}{}",
            self.config()?.folder_url(),
            urlencoding::encode(filename)
        ))
    }

    fn request(&self, method: Method, url: &str) -> Result<reqwest::RequestBuilder> {
        let config = self.config()?;
        Ok(self
            .client
            .request(method, url)
            .basic_auth(&config.username, Some(&config.password)))
    }

    async fn head(&self, filename: &str) -> Result<HeadOutcome> {
        let url = self.file_url(filename)?;
        let response = match self.request(Method::HEAD, &url)?.send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(driver = self.name(), %url, %error, "Remote unreachable");
                return Ok(HeadOutcome::Unreachable);
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => Ok(HeadOutcome::Missing),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::warn!(
                    driver = self.name(),
                    status = response.status().as_u16(),
                    "Remote rejected credentials"
                );
                Ok(HeadOutcome::Unreachable)
            }
            status if status.is_success() => Ok(HeadOutcome::Found(describe_response(
                &response, &url, filename,
            ))),
            _ => Err(http_failure("HEAD", &url, response).await),
        }
    }

    async fn ensure_folder(&self) -> Result<()> {
        if self.folder_ready.load(Ordering::SeqCst) {
            return Ok(());
        }
        let url = self.config()?.folder_url();
        let mkcol = Method::from_bytes(b"MKCOL")
            .map_err(|error| Error::Storage(format!("Invalid WebDAV method: {error}")))?;
        let response = self.request(mkcol, &url)?.send().await?;
        // 405 means the collection already exists.
        if response.status().is_success() || response.status() == StatusCode::METHOD_NOT_ALLOWED {
            self.folder_ready.store(true, Ordering::SeqCst);
            return Ok(());
        }
        Err(http_failure("MKCOL", &url, response).await)
    }
}

enum HeadOutcome {
    Found(DriverFileInfo),
    Missing,
    Unreachable,
}

impl StorageDriver for WebDavDriver {
    type Config = WebDavConfig;

    fn name(&self) -> &'static str {
        "webdav"
    }

    fn configure(&mut self, config: WebDavConfig) -> Result<()> {
        if !is_http_url(config.url.trim()) {
            return Err(Error::InvalidInput(
                "WebDAV url must start with http:// or https://".to_string(),
            ));
        }
        if config.username.trim().is_empty() {
            return Err(Error::InvalidInput(
                "WebDAV username cannot be empty".to_string(),
            ));
        }
        self.config = Some(config);
        self.folder_ready = Arc::default();
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn fetch_files_info(&self, filenames: &[&str]) -> Result<FilesInfo> {
        self.config()?;
        let mut files = Vec::new();
        for filename in filenames {
            match self.head(filename).await? {
                HeadOutcome::Found(info) => files.push(info),
                HeadOutcome::Missing => {}
                HeadOutcome::Unreachable => return Ok(FilesInfo::offline()),
            }
        }
        Ok(FilesInfo {
            connected: true,
            files,
        })
    }

    async fn push_file(&self, filename: &str, content: &str) -> Result<DriverFileInfo> {
        let url = self.file_url(filename)?;
        self.ensure_folder().await?;

        let response = self
            .request(Method::PUT, &url)?
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(content.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(http_failure("PUT", &url, response).await);
        }

        let mut info = match self.head(filename).await? {
            HeadOutcome::Found(info) => info,
            HeadOutcome::Missing | HeadOutcome::Unreachable => DriverFileInfo {
                providerid: url,
                filename: filename.to_string(),
                updated: now_ms(),
                hash: None,
                size: None,
            },
        };
        info.hash = Some(content_hash(content.as_bytes()));
        info.size = Some(content.len() as u64);
        Ok(info)
    }

    async fn pull_file(&self, _providerid: &str, filename: &str) -> Result<Option<String>> {
        let url = self.file_url(filename)?;
        let response = self.request(Method::GET, &url)?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(http_failure("GET", &url, response).await);
        }
        Ok(Some(response.text().await?))
    }

    async fn delete_file(&self, _providerid: &str, filename: &str) -> Result<()> {
        let url = self.file_url(filename)?;
        let response = self.request(Method::DELETE, &url)?.send().await?;
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(http_failure("DELETE", &url, response).await)
    }
}

fn describe_response(response: &Response, url: &str, filename: &str) -> DriverFileInfo {
    let header = |name: reqwest::header::HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
    };

    DriverFileInfo {
        providerid: url.to_string(),
        filename: filename.to_string(),
        updated: header(reqwest::header::LAST_MODIFIED)
            .as_deref()
            .and_then(parse_http_date)
            .unwrap_or_else(now_ms),
        hash: header(reqwest::header::ETAG).map(|etag| etag.trim_matches('"').to_string()),
        size: header(reqwest::header::CONTENT_LENGTH).and_then(|len| len.parse().ok()),
    }
}

fn parse_http_date(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.timestamp_millis())
}

async fn http_failure(operation: &str, url: &str, response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::Storage(format!(
        "WebDAV {operation} {url} failed with HTTP {status}: {}",
        compact_text(&body)
    ))
}
