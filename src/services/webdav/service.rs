use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::errors::RemoteError;
use crate::models::{EntryKind, RemoteEntry};
use crate::storage::RemoteStorage;

use super::config::{RetryConfig, WebDAVConfig};
use super::connection::WebDAVConnection;
use super::xml::parse_multistatus;

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
    <D:propfind xmlns:D="DAV:">
        <D:prop>
            <D:displayname/>
            <D:getcontentlength/>
            <D:getlastmodified/>
            <D:getetag/>
            <D:resourcetype/>
        </D:prop>
    </D:propfind>"#;

/// WebDAV-backed implementation of the remote storage capability.
pub struct WebDAVRemote {
    connection: WebDAVConnection,
    config: WebDAVConfig,
    propfind: Method,
    mkcol: Method,
}

impl WebDAVRemote {
    pub fn new(config: WebDAVConfig) -> Result<Self> {
        Self::new_with_retry(config, RetryConfig::default())
    }

    pub fn new_with_retry(config: WebDAVConfig, retry_config: RetryConfig) -> Result<Self> {
        let connection = WebDAVConnection::new(config.clone(), retry_config)?;
        let propfind = Method::from_bytes(b"PROPFIND")?;
        let mkcol = Method::from_bytes(b"MKCOL")?;

        Ok(Self {
            connection,
            config,
            propfind,
            mkcol,
        })
    }

    /// Tests connectivity against the DAV root.
    pub async fn test_connection(&self) -> Result<(), RemoteError> {
        info!("🔍 Testing WebDAV connection to {}", self.config.base_url());
        self.connection.test_connection().await
    }

    /// Lists the direct children of one remote directory.
    async fn list_single_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let url = self.config.url_for_path(path);

        let response = self
            .connection
            .request(
                self.propfind.clone(),
                &url,
                Some(PROPFIND_BODY.to_string()),
                Some(vec![("Depth", "1"), ("Content-Type", "application/xml")]),
            )
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(RemoteError::not_found(path));
        }
        if status.as_u16() != 207 && !status.is_success() {
            return Err(RemoteError::Unexpected {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = self.connection.read_text(&url, response).await?;
        let entries = parse_multistatus(&body)?;

        let base_path = self.config.base_path();
        let requested = normalize(path);

        // Strip the server prefix from hrefs and drop the listed directory's
        // own entry.
        let mut children = Vec::new();
        for mut entry in entries {
            let stripped = match entry.path.strip_prefix(&base_path) {
                Some(rest) if base_path.is_empty() || rest.is_empty() || rest.starts_with('/') => {
                    rest.to_string()
                }
                _ => entry.path.clone(),
            };
            let stripped = normalize(&stripped);
            if stripped == requested {
                continue;
            }
            entry.path = stripped;
            children.push(entry);
        }

        Ok(children)
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl RemoteStorage for WebDAVRemote {
    async fn stat(&self, path: &str) -> Result<Option<EntryKind>, RemoteError> {
        let url = self.config.url_for_path(path);

        let response = self
            .connection
            .request(
                self.propfind.clone(),
                &url,
                Some(PROPFIND_BODY.to_string()),
                Some(vec![("Depth", "0"), ("Content-Type", "application/xml")]),
            )
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if status.as_u16() != 207 && !status.is_success() {
            return Err(RemoteError::Unexpected {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = self.connection.read_text(&url, response).await?;
        let entries = parse_multistatus(&body)?;

        match entries.first() {
            Some(entry) => Ok(Some(entry.kind)),
            None => Ok(None),
        }
    }

    async fn create_directory(&self, path: &str) -> Result<(), RemoteError> {
        let url = self.config.url_for_path(path);
        debug!("📁 MKCOL {}", path);

        let response = self
            .connection
            .request(self.mkcol.clone(), &url, None, None)
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // MKCOL on an existing collection is 405 Method Not Allowed
        if status.as_u16() == 405 {
            return Err(RemoteError::already_exists(path));
        }

        Err(RemoteError::Unexpected {
            path: path.to_string(),
            status: status.as_u16(),
        })
    }

    async fn list_directory_recursive(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        // Iterative Depth-1 walk; Depth: infinity is disabled on most servers.
        let mut all_entries = Vec::new();
        let mut pending = vec![normalize(path)];
        let mut first = true;

        while let Some(directory) = pending.pop() {
            let children = match self.list_single_directory(&directory).await {
                Ok(children) => children,
                Err(e) if e.is_not_found() && !first => {
                    // Directory vanished between listing its parent and
                    // descending into it.
                    warn!("Remote directory disappeared during listing: {}", directory);
                    continue;
                }
                Err(e) => return Err(e),
            };
            first = false;

            for entry in children {
                if entry.kind == EntryKind::Directory {
                    pending.push(entry.path.clone());
                }
                all_entries.push(entry);
            }
        }

        debug!(
            "Recursive listing of {} found {} entries",
            path,
            all_entries.len()
        );
        Ok(all_entries)
    }

    async fn get_file_content(&self, path: &str) -> Result<String, RemoteError> {
        let url = self.config.url_for_path(path);
        debug!("⬇️ GET {}", path);

        let response = self
            .connection
            .request(Method::GET, &url, None, None)
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(RemoteError::not_found(path));
        }
        if !status.is_success() {
            return Err(RemoteError::Unexpected {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        self.connection.read_text(&url, response).await
    }

    async fn put_file_content(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        let url = self.config.url_for_path(path);
        debug!("⬆️ PUT {} ({} bytes)", path, content.len());

        let response = self
            .connection
            .request(Method::PUT, &url, Some(content.to_string()), None)
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(RemoteError::Unexpected {
            path: path.to_string(),
            status: status.as_u16(),
        })
    }
}
