use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use super::VaultStorage;

/// Filesystem-backed vault rooted at a single directory.
#[derive(Debug, Clone)]
pub struct LocalVault {
    base: PathBuf,
}

impl LocalVault {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let relative = path.trim_start_matches('/');
        self.base.join(relative)
    }
}

#[async_trait]
impl VaultStorage for LocalVault {
    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }

    async fn read(&self, path: &str) -> io::Result<String> {
        tokio::fs::read_to_string(self.resolve(path)).await
    }

    async fn write(&self, path: &str, content: &str) -> io::Result<()> {
        tokio::fs::write(self.resolve(path), content).await
    }

    async fn create_file(&self, path: &str, content: &str) -> io::Result<()> {
        tokio::fs::write(self.resolve(path), content).await
    }

    async fn create_dir_all(&self, path: &str) -> io::Result<()> {
        match tokio::fs::create_dir_all(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn list_markdown_files(&self, root: &str) -> io::Result<Vec<String>> {
        let base = self.base.clone();
        let scan_root = self.resolve(root);

        tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();

            if !scan_root.exists() {
                return Ok(files);
            }

            for entry in WalkDir::new(&scan_root).follow_links(false) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Skipping unreadable vault entry: {}", e);
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }

                let is_markdown = entry
                    .file_name()
                    .to_str()
                    .map(|name| name.to_ascii_lowercase().ends_with(".md"))
                    .unwrap_or(false);
                if !is_markdown {
                    continue;
                }

                match entry.path().strip_prefix(&base) {
                    Ok(relative) => {
                        let parts: Vec<String> = relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy().into_owned())
                            .collect();
                        files.push(parts.join("/"));
                    }
                    Err(_) => {
                        warn!("Vault entry escapes the vault root: {}", entry.path().display());
                    }
                }
            }

            files.sort();
            Ok(files)
        })
        .await
        .map_err(|e| io::Error::other(e))?
    }
}
