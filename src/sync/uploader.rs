use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::models::PassReport;
use crate::storage::{RemoteStorage, VaultStorage};

use super::ensure::ensure_remote_directories;
use super::paths;

/// Pushes local markdown files to their mapped remote locations.
///
/// Upload policy is last-writer-wins: whenever content differs the remote
/// copy is overwritten, with no etag or modification-time arbitration.
pub struct ChangeUploader {
    remote: Arc<dyn RemoteStorage>,
    vault: Arc<dyn VaultStorage>,
    local_base: String,
    remote_root: String,
}

impl ChangeUploader {
    pub fn new(
        remote: Arc<dyn RemoteStorage>,
        vault: Arc<dyn VaultStorage>,
        local_base: &str,
        remote_root: &str,
    ) -> Self {
        Self {
            remote,
            vault,
            local_base: local_base.to_string(),
            remote_root: remote_root.to_string(),
        }
    }

    /// Uploads one local file: read, map, ensure remote parents, write.
    ///
    /// A remote copy that already holds identical bytes is left untouched so
    /// a pass over an unchanged tree performs zero writes. When content
    /// differs the remote copy is overwritten regardless of which side is
    /// newer.
    pub async fn upload_file(&self, local_path: &str) -> Result<UploadAction, SyncError> {
        let content = self
            .vault
            .read(local_path)
            .await
            .map_err(|e| SyncError::vault(local_path, e))?;

        let remote_path = paths::local_to_remote(local_path, &self.local_base, &self.remote_root);

        match self.remote.get_file_content(&remote_path).await {
            Ok(existing) if existing == content => {
                return Ok(UploadAction::Unchanged);
            }
            Ok(_) => {
                // Remote file exists, so its parent chain does too.
                self.remote.put_file_content(&remote_path, &content).await?;
            }
            Err(e) if e.is_not_found() => {
                let parent = paths::remote_parent(&remote_path);
                ensure_remote_directories(self.remote.as_ref(), &parent).await?;
                self.remote.put_file_content(&remote_path, &content).await?;
            }
            Err(e) => return Err(e.into()),
        }

        debug!("⬆️ Uploaded {} -> {}", local_path, remote_path);
        Ok(UploadAction::Uploaded)
    }

    /// Uploads every tracked local markdown file sequentially. Per-file
    /// failures land in the report; connection-scope failures abort.
    pub async fn upload_all(
        &self,
        report: &mut PassReport,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let files = self
            .vault
            .list_markdown_files(&self.local_base)
            .await
            .map_err(|e| SyncError::vault(self.local_base.as_str(), e))?;

        info!("⬆️ Upload phase: {} local markdown files", files.len());

        for local_path in files {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            match self.upload_file(&local_path).await {
                Ok(UploadAction::Uploaded) => report.files_uploaded += 1,
                Ok(UploadAction::Unchanged) => report.files_unchanged += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping upload of '{}': {}", local_path, e);
                    report.record_failure(&local_path, &e);
                }
            }
        }

        Ok(())
    }
}

pub enum UploadAction {
    Uploaded,
    Unchanged,
}
