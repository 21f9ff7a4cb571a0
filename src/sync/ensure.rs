use tracing::debug;

use crate::errors::RemoteError;
use crate::storage::RemoteStorage;

/// Guarantees every component of `dir_path` exists remotely, creating missing
/// levels root-to-leaf.
///
/// Idempotent: a second call over the same path performs zero creates.
/// Another actor creating a directory between our stat and our create is a
/// benign race; the resulting `AlreadyExists` counts as success.
pub async fn ensure_remote_directories(
    remote: &dyn RemoteStorage,
    dir_path: &str,
) -> Result<(), RemoteError> {
    let mut prefix = String::new();

    for component in dir_path.split('/').filter(|c| !c.is_empty()) {
        prefix.push('/');
        prefix.push_str(component);

        if remote.stat(&prefix).await?.is_some() {
            continue;
        }

        match remote.create_directory(&prefix).await {
            Ok(()) => debug!("📁 Created remote directory {}", prefix),
            Err(e) if e.is_already_exists() => {
                debug!("Remote directory {} appeared concurrently", prefix);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}
