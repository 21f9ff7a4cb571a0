use async_trait::async_trait;

use crate::errors::RemoteError;
use crate::models::{EntryKind, RemoteEntry};

pub mod vault;

pub use vault::LocalVault;

/// Capability the sync engine requires from a remote backend.
///
/// Paths are absolute inside the remote file namespace (`/Collectives/...`).
/// Implementations must map "does not exist" to `RemoteError::NotFound` and a
/// create racing another writer to `RemoteError::AlreadyExists`, so callers
/// can tell benign outcomes from hard failures.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Returns the kind of the entry at `path`, or `None` when nothing exists
    /// there. Only genuine transport or server failures are errors.
    async fn stat(&self, path: &str) -> Result<Option<EntryKind>, RemoteError>;

    async fn create_directory(&self, path: &str) -> Result<(), RemoteError>;

    /// Lists every entry below `path`, any depth. Fails with `NotFound` when
    /// `path` itself does not exist.
    async fn list_directory_recursive(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    async fn get_file_content(&self, path: &str) -> Result<String, RemoteError>;

    /// Create-or-replace write of the full content.
    async fn put_file_content(&self, path: &str, content: &str) -> Result<(), RemoteError>;
}

/// Capability the sync engine requires from the local vault.
///
/// Paths are vault-relative with `/` separators (`notes/a.md`).
#[async_trait]
pub trait VaultStorage: Send + Sync {
    async fn exists(&self, path: &str) -> bool;

    async fn read(&self, path: &str) -> std::io::Result<String>;

    async fn write(&self, path: &str, content: &str) -> std::io::Result<()>;

    async fn create_file(&self, path: &str, content: &str) -> std::io::Result<()>;

    /// Creates the directory and all missing ancestors; an already existing
    /// directory is success.
    async fn create_dir_all(&self, path: &str) -> std::io::Result<()>;

    /// All markdown files under `root` (vault-relative; empty means the whole
    /// vault), in a stable order.
    async fn list_markdown_files(&self, root: &str) -> std::io::Result<Vec<String>>;
}
