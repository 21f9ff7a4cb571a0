use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::SyncError;
use crate::models::{PassReport, RemoteEntry};
use crate::storage::{RemoteStorage, VaultStorage};

use super::paths;

/// Pulls the remote collective subtree back into the vault.
///
/// Download policy is last-download-wins: differing local content is
/// overwritten with the remote copy. Identical content is left untouched so
/// no modification event fires and the save hook cannot re-trigger itself.
pub struct ChangeDownloader {
    remote: Arc<dyn RemoteStorage>,
    vault: Arc<dyn VaultStorage>,
    local_base: String,
    remote_root: String,
}

impl ChangeDownloader {
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

    /// Reconciles every remote markdown file against the vault. Per-file
    /// failures land in the report; connection-scope failures abort.
    pub async fn download_all(
        &self,
        report: &mut PassReport,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let entries = match self.remote.list_directory_recursive(&self.remote_root).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => {
                // Collective root not created yet on the server; nothing to pull.
                info!(
                    "Remote root {} does not exist yet, skipping download phase",
                    self.remote_root
                );
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let markdown: Vec<&RemoteEntry> =
            entries.iter().filter(|e| e.is_markdown_file()).collect();

        info!("⬇️ Download phase: {} remote markdown files", markdown.len());

        for entry in markdown {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            match self.download_entry(entry).await {
                Ok(DownloadAction::Created) | Ok(DownloadAction::Updated) => {
                    report.files_downloaded += 1;
                }
                Ok(DownloadAction::Unchanged) => report.files_unchanged += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Skipping download of '{}': {}", entry.path, e);
                    report.record_failure(&entry.path, &e);
                }
            }
        }

        Ok(())
    }

    async fn download_entry(&self, entry: &RemoteEntry) -> Result<DownloadAction, SyncError> {
        let local_path = paths::remote_to_local(&entry.path, &self.remote_root, &self.local_base)?;

        let remote_content = self.remote.get_file_content(&entry.path).await?;

        if self.vault.exists(&local_path).await {
            let local_content = self
                .vault
                .read(&local_path)
                .await
                .map_err(|e| SyncError::vault(local_path.as_str(), e))?;

            if local_content == remote_content {
                return Ok(DownloadAction::Unchanged);
            }

            self.vault
                .write(&local_path, &remote_content)
                .await
                .map_err(|e| SyncError::vault(local_path.as_str(), e))?;

            debug!("⬇️ Updated {} <- {}", local_path, entry.path);
            return Ok(DownloadAction::Updated);
        }

        let parent = paths::local_parent(&local_path);
        if !parent.is_empty() {
            self.vault
                .create_dir_all(&parent)
                .await
                .map_err(|e| SyncError::vault(parent.as_str(), e))?;
        }

        self.vault
            .create_file(&local_path, &remote_content)
            .await
            .map_err(|e| SyncError::vault(local_path.as_str(), e))?;

        debug!("⬇️ Created {} <- {}", local_path, entry.path);
        Ok(DownloadAction::Created)
    }
}

enum DownloadAction {
    Created,
    Updated,
    Unchanged,
}
