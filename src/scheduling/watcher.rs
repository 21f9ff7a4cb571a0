use anyhow::Result;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::sync::SyncOrchestrator;

/// Watches the vault for modified markdown files and feeds them into the
/// orchestrator's save hook. Only create and modify events matter; the
/// downloader never rewrites identical content, so our own download writes
/// settle instead of ping-ponging through this watcher.
pub async fn watch_vault(
    vault_root: PathBuf,
    orchestrator: Arc<SyncOrchestrator>,
    cancel: CancellationToken,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(100);

    let mut watcher = RecommendedWatcher::new(
        move |res| {
            if let Err(e) = tx.blocking_send(res) {
                error!("Failed to forward file event: {}", e);
            }
        },
        notify::Config::default(),
    )?;

    watcher.watch(&vault_root, RecursiveMode::Recursive)?;
    info!("Watching vault for changes: {}", vault_root.display());

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => {
                info!("Vault watcher stopped");
                return Ok(());
            }
            event = rx.recv() => event,
        };

        let event = match event {
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                error!("Vault watch error: {}", e);
                continue;
            }
            None => {
                debug!("Vault watch channel closed");
                return Ok(());
            }
        };

        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            continue;
        }

        for path in &event.paths {
            if let Some(relative) = vault_relative(path, &vault_root) {
                orchestrator.on_file_changed(&relative).await;
            }
        }
    }
}

fn vault_relative(path: &Path, vault_root: &Path) -> Option<String> {
    let relative = path.strip_prefix(vault_root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_absolute_paths_to_vault_relative() {
        let root = PathBuf::from("/vault");
        assert_eq!(
            vault_relative(Path::new("/vault/notes/a.md"), &root),
            Some("notes/a.md".to_string())
        );
        assert_eq!(vault_relative(Path::new("/elsewhere/a.md"), &root), None);
        assert_eq!(vault_relative(Path::new("/vault"), &root), None);
    }
}
