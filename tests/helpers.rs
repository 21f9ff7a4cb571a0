//! Shared fixtures for the engine tests: an in-memory remote and vault
//! builders.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use collectsync::config::Config;
use collectsync::errors::RemoteError;
use collectsync::models::{EntryKind, RemoteEntry};
use collectsync::storage::RemoteStorage;

/// How an injected failure should present itself.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Per-file failure: recorded, batch continues.
    PerFile,
    /// Connection-scope failure: aborts the pass.
    Connection,
}

#[derive(Default)]
struct FakeState {
    directories: BTreeSet<String>,
    files: BTreeMap<String, String>,
    /// Paths where stat reports missing but create reports AlreadyExists,
    /// simulating another actor winning the check/create race.
    race_paths: HashSet<String>,
    failing_gets: std::collections::HashMap<String, FailMode>,
    create_calls: usize,
    put_calls: usize,
    get_calls: usize,
    list_calls: usize,
}

/// In-memory remote storage with operation counters.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
    /// Delay injected into every listing, to hold passes open while another
    /// trigger fires.
    pub list_delay: Option<Duration>,
    active_ops: AtomicUsize,
    max_active_ops: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list_delay(delay: Duration) -> Self {
        Self {
            list_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seed_dir(&self, path: &str) {
        self.state
            .lock()
            .unwrap()
            .directories
            .insert(path.to_string());
    }

    pub fn seed_file(&self, path: &str, content: &str) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), content.to_string());
    }

    /// After this, `path` stats as missing but creating it reports
    /// AlreadyExists.
    pub fn lose_create_race_on(&self, path: &str) {
        self.state.lock().unwrap().race_paths.insert(path.to_string());
    }

    /// Make reads of `path` fail with the given mode.
    pub fn fail_get_on(&self, path: &str, mode: FailMode) {
        self.state
            .lock()
            .unwrap()
            .failing_gets
            .insert(path.to_string(), mode);
    }

    pub fn file_content(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn directories(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .directories
            .iter()
            .cloned()
            .collect()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn put_calls(&self) -> usize {
        self.state.lock().unwrap().put_calls
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    /// Highest number of remote operations ever observed in flight at once.
    pub fn max_concurrent_ops(&self) -> usize {
        self.max_active_ops.load(Ordering::SeqCst)
    }

    fn track_enter(&self) {
        let active = self.active_ops.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_ops.fetch_max(active, Ordering::SeqCst);
    }

    fn track_exit(&self) {
        self.active_ops.fetch_sub(1, Ordering::SeqCst);
    }

    fn has_children(state: &FakeState, root: &str) -> bool {
        let prefix = format!("{}/", root.trim_end_matches('/'));
        state.directories.iter().any(|d| d.starts_with(&prefix))
            || state.files.keys().any(|f| f.starts_with(&prefix))
    }
}

fn entry_for_file(path: &str, content: &str) -> RemoteEntry {
    RemoteEntry {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or("").to_string(),
        kind: EntryKind::File,
        last_modified: None,
        size: content.len() as i64,
        etag: Some(format!("\"{}\"", content.len())),
    }
}

fn entry_for_dir(path: &str) -> RemoteEntry {
    RemoteEntry {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or("").to_string(),
        kind: EntryKind::Directory,
        last_modified: None,
        size: 0,
        etag: None,
    }
}

#[async_trait]
impl RemoteStorage for FakeRemote {
    async fn stat(&self, path: &str) -> Result<Option<EntryKind>, RemoteError> {
        self.track_enter();
        let result = {
            let state = self.state.lock().unwrap();
            if state.race_paths.contains(path) {
                Ok(None)
            } else if state.directories.contains(path) {
                Ok(Some(EntryKind::Directory))
            } else if state.files.contains_key(path) {
                Ok(Some(EntryKind::File))
            } else {
                Ok(None)
            }
        };
        self.track_exit();
        result
    }

    async fn create_directory(&self, path: &str) -> Result<(), RemoteError> {
        self.track_enter();
        let result = {
            let mut state = self.state.lock().unwrap();
            state.create_calls += 1;
            if state.race_paths.contains(path) {
                state.race_paths.remove(path);
                state.directories.insert(path.to_string());
                Err(RemoteError::already_exists(path))
            } else if state.directories.contains(path) {
                Err(RemoteError::already_exists(path))
            } else {
                state.directories.insert(path.to_string());
                Ok(())
            }
        };
        self.track_exit();
        result
    }

    async fn list_directory_recursive(&self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.track_enter();
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        let result = {
            let mut state = self.state.lock().unwrap();
            state.list_calls += 1;

            let root = path.trim_end_matches('/');
            if !state.directories.contains(root) && !Self::has_children(&state, root) {
                Err(RemoteError::not_found(root))
            } else {
                let prefix = format!("{}/", root);
                let mut entries = Vec::new();
                for dir in state.directories.iter().filter(|d| d.starts_with(&prefix)) {
                    entries.push(entry_for_dir(dir));
                }
                for (file, content) in state.files.iter().filter(|(f, _)| f.starts_with(&prefix)) {
                    entries.push(entry_for_file(file, content));
                }
                Ok(entries)
            }
        };
        self.track_exit();
        result
    }

    async fn get_file_content(&self, path: &str) -> Result<String, RemoteError> {
        self.track_enter();
        let result = {
            let mut state = self.state.lock().unwrap();
            state.get_calls += 1;
            match state.failing_gets.get(path) {
                Some(FailMode::PerFile) => Err(RemoteError::Protocol {
                    path: path.to_string(),
                    details: "injected read failure".to_string(),
                }),
                Some(FailMode::Connection) => Err(RemoteError::Server {
                    url: path.to_string(),
                    status: 503,
                }),
                None => state
                    .files
                    .get(path)
                    .cloned()
                    .ok_or_else(|| RemoteError::not_found(path)),
            }
        };
        self.track_exit();
        result
    }

    async fn put_file_content(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.track_enter();
        let result = {
            let mut state = self.state.lock().unwrap();
            state.put_calls += 1;
            state.files.insert(path.to_string(), content.to_string());
            Ok(())
        };
        self.track_exit();
        result
    }
}

/// Config pointing at a temp vault, collective path `/Collectives`.
pub fn test_config(vault_path: &std::path::Path) -> Config {
    Config {
        server_url: "https://cloud.example.com".to_string(),
        credentials: Some(collectsync::config::Credentials::Password {
            username: "alice".to_string(),
            password: "secret".to_string(),
        }),
        collective_path: "/Collectives".to_string(),
        local_folder_path: String::new(),
        vault_path: vault_path.to_path_buf(),
        sync_interval_minutes: 0,
        sync_on_startup: false,
        sync_on_save: true,
        startup_delay_seconds: 0,
    }
}
