use crate::errors::SyncError;

/// Pure path translation between vault-relative local paths and
/// collective-relative remote paths. No I/O happens here.

/// Maps a local vault path onto its remote location.
///
/// `local_base` (the configured local folder) is stripped when the path lies
/// under it; the remainder is joined onto `remote_root` with exactly one `/`
/// in between. An empty `local_base` leaves relative paths untouched.
pub fn local_to_remote(local_path: &str, local_base: &str, remote_root: &str) -> String {
    let relative = strip_base(local_path, local_base);
    let relative = relative.strip_prefix('/').unwrap_or(relative);

    format!("{}/{}", remote_root.trim_end_matches('/'), relative)
}

/// Maps a remote path back into the vault.
///
/// `remote_root` must be a real prefix of `remote_path` (trailing-slash
/// variants of the root are accepted); anything else is a mapping error
/// rather than a silently corrupted path.
pub fn remote_to_local(
    remote_path: &str,
    remote_root: &str,
    local_base: &str,
) -> Result<String, SyncError> {
    let root = remote_root.trim_end_matches('/');

    let rest = match remote_path.strip_prefix(root) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return Err(SyncError::path_mapping(remote_path, remote_root)),
    };

    let rest = rest.strip_prefix('/').unwrap_or(rest);

    if local_base.is_empty() {
        Ok(rest.to_string())
    } else if rest.is_empty() {
        Ok(local_base.trim_end_matches('/').to_string())
    } else {
        Ok(format!("{}/{}", local_base.trim_end_matches('/'), rest))
    }
}

/// Parent directory of a remote path, or the root itself.
pub fn remote_parent(remote_path: &str) -> String {
    match remote_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => remote_path[..idx].to_string(),
    }
}

/// Parent directory of a vault-relative path; empty when the file sits at the
/// top level.
pub fn local_parent(local_path: &str) -> String {
    match local_path.rfind('/') {
        Some(idx) => local_path[..idx].to_string(),
        None => String::new(),
    }
}

/// Whether `path` lies under `base` (component-aware; `base` empty means
/// everything qualifies).
pub fn is_under(path: &str, base: &str) -> bool {
    if base.is_empty() {
        return true;
    }
    let base = base.trim_end_matches('/');
    match path.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn strip_base<'a>(path: &'a str, base: &str) -> &'a str {
    if base.is_empty() {
        return path;
    }
    let base = base.trim_end_matches('/');
    match path.strip_prefix(base) {
        // Only strip at a component boundary; "journalx/a.md" is not under
        // "journal".
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}
