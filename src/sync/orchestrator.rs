use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::errors::{AppError, SyncError};
use crate::models::{PassReport, SyncOutcome, SyncStatus};
use crate::scheduling::{watch_vault, SyncScheduler};
use crate::storage::{RemoteStorage, VaultStorage};

use super::downloader::ChangeDownloader;
use super::uploader::ChangeUploader;

/// Drives complete upload-then-download passes over the vault.
///
/// Triggers (manual, interval timer, startup timer, save hook) all funnel
/// into [`SyncOrchestrator::sync_now`]. Passes are single-flight: a trigger
/// arriving while a pass is running is coalesced into one follow-up pass run
/// by the in-flight caller, never a concurrent pass.
pub struct SyncOrchestrator {
    vault: Arc<dyn VaultStorage>,
    /// Replaced wholesale when settings change; an in-flight pass keeps the
    /// snapshot it started with.
    remote: RwLock<Option<Arc<dyn RemoteStorage>>>,
    local_base: String,
    remote_root: String,
    sync_on_save: bool,
    run_lock: Mutex<()>,
    pending: AtomicBool,
    started: AtomicBool,
    status_tx: watch::Sender<SyncStatus>,
    cancel: CancellationToken,
}

impl SyncOrchestrator {
    pub fn new(config: &Config, vault: Arc<dyn VaultStorage>) -> Self {
        Self::build(config, vault, None)
    }

    pub fn with_remote(
        config: &Config,
        vault: Arc<dyn VaultStorage>,
        remote: Arc<dyn RemoteStorage>,
    ) -> Self {
        Self::build(config, vault, Some(remote))
    }

    fn build(
        config: &Config,
        vault: Arc<dyn VaultStorage>,
        remote: Option<Arc<dyn RemoteStorage>>,
    ) -> Self {
        let (status_tx, _status_rx) = watch::channel(SyncStatus::Idle);

        Self {
            vault,
            remote: RwLock::new(remote),
            local_base: config.local_folder_path.clone(),
            remote_root: config.collective_path.clone(),
            sync_on_save: config.sync_on_save,
            run_lock: Mutex::new(()),
            pending: AtomicBool::new(false),
            started: AtomicBool::new(false),
            status_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Swaps the remote connection. `None` disconnects.
    pub async fn set_remote(&self, remote: Option<Arc<dyn RemoteStorage>>) {
        let mut slot = self.remote.write().await;
        *slot = remote;
    }

    pub fn status(&self) -> SyncStatus {
        self.status_tx.borrow().clone()
    }

    /// Channel for host status indicators.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns the background triggers: interval/startup timers and, when
    /// sync-on-save is configured, the vault watcher.
    pub fn start(self: &Arc<Self>, config: &Config) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Sync orchestrator already started");
            return;
        }

        let scheduler = SyncScheduler::new(self.clone(), config);
        tokio::spawn(async move {
            scheduler.run().await;
        });

        if config.sync_on_save {
            let vault_root = config.vault_path.clone();
            let orchestrator = self.clone();
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                if let Err(e) = watch_vault(vault_root, orchestrator, cancel).await {
                    error!("Vault watcher error: {}", e);
                }
            });
        }
    }

    /// Stops background triggers and cancels any in-flight pass at the next
    /// per-file boundary.
    pub fn stop(&self) {
        info!("Stopping sync orchestrator");
        self.cancel.cancel();
    }

    /// Runs one synchronization pass now, or coalesces into the in-flight one.
    pub async fn sync_now(&self) -> SyncOutcome {
        let mut remote = match self.snapshot_remote().await {
            Some(remote) => remote,
            None => {
                info!("Not connected to a collective server; sync skipped");
                return SyncOutcome::NotConnected;
            }
        };

        loop {
            let guard = match self.run_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    self.pending.store(true, Ordering::SeqCst);
                    debug!("Sync already in flight; trigger coalesced");
                    return SyncOutcome::Coalesced;
                }
            };

            // Requests that arrived before we took the lock are absorbed by
            // the pass we are about to run.
            self.pending.store(false, Ordering::SeqCst);

            self.set_status(SyncStatus::Syncing);
            let result = self.run_pass(remote.clone()).await;
            drop(guard);

            let outcome = match result {
                Ok(report) => {
                    self.set_status(SyncStatus::Connected);
                    SyncOutcome::Completed(report)
                }
                Err(SyncError::Cancelled) => {
                    self.set_status(SyncStatus::Idle);
                    SyncOutcome::Cancelled
                }
                Err(e) => {
                    error!("❌ Sync pass failed: {}", e);
                    self.set_status(SyncStatus::Error {
                        message: e.user_message(),
                    });
                    SyncOutcome::Failed(e.to_string())
                }
            };

            if matches!(outcome, SyncOutcome::Cancelled) {
                return outcome;
            }

            if !self.pending.swap(false, Ordering::SeqCst) {
                return outcome;
            }

            debug!("Trigger arrived mid-pass; running follow-up pass");
            remote = match self.snapshot_remote().await {
                Some(remote) => remote,
                None => return outcome,
            };
        }
    }

    /// Save-hook entry point. Ignores files that are not markdown or lie
    /// outside the configured local folder.
    pub async fn on_file_changed(&self, local_path: &str) -> Option<SyncOutcome> {
        if !self.sync_on_save {
            return None;
        }

        if !local_path.to_ascii_lowercase().ends_with(".md") {
            return None;
        }

        if !super::paths::is_under(local_path, &self.local_base) {
            return None;
        }

        debug!("Save hook fired for {}", local_path);
        Some(self.sync_now().await)
    }

    async fn snapshot_remote(&self) -> Option<Arc<dyn RemoteStorage>> {
        self.remote.read().await.clone()
    }

    async fn run_pass(&self, remote: Arc<dyn RemoteStorage>) -> Result<PassReport, SyncError> {
        let mut report = PassReport::new(&self.local_base, &self.remote_root);
        info!(
            "🔄 Sync pass {} starting ({} -> {})",
            report.pass_id,
            if self.local_base.is_empty() {
                "<vault root>"
            } else {
                &self.local_base
            },
            self.remote_root
        );

        let uploader = ChangeUploader::new(
            remote.clone(),
            self.vault.clone(),
            &self.local_base,
            &self.remote_root,
        );
        uploader.upload_all(&mut report, &self.cancel).await?;

        let downloader = ChangeDownloader::new(
            remote,
            self.vault.clone(),
            &self.local_base,
            &self.remote_root,
        );
        downloader.download_all(&mut report, &self.cancel).await?;

        report.finish();
        info!(
            "✅ Sync pass {} complete: {} uploaded, {} downloaded, {} unchanged, {} failed",
            report.pass_id,
            report.files_uploaded,
            report.files_downloaded,
            report.files_unchanged,
            report.failed()
        );

        if !report.failures.is_empty() {
            for failure in &report.failures {
                warn!("  failed: {} ({})", failure.path, failure.reason);
            }
        }

        Ok(report)
    }

    fn set_status(&self, status: SyncStatus) {
        self.status_tx.send_replace(status);
    }
}
