use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry from a remote directory listing. Read-only: the engine compares
/// these, it never mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Absolute path inside the remote file namespace, e.g. `/Collectives/notes/a.md`.
    pub path: String,
    pub name: String,
    pub kind: EntryKind,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: i64,
    pub etag: Option<String>,
}

impl RemoteEntry {
    pub fn is_markdown_file(&self) -> bool {
        self.kind == EntryKind::File && self.name.to_ascii_lowercase().ends_with(".md")
    }
}

/// Orchestrator status as seen by the host: Idle → Syncing → (Connected | Error).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Connected,
    Error { message: String },
}

/// One failed per-file operation inside a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

/// Ephemeral record of one upload-then-download pass. Created at pass start,
/// reported at pass end, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub local_folder_path: String,
    pub collective_path: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub files_uploaded: usize,
    pub files_downloaded: usize,
    pub files_unchanged: usize,
    pub failures: Vec<FileFailure>,
}

impl PassReport {
    pub fn new(local_folder_path: &str, collective_path: &str) -> Self {
        Self {
            pass_id: Uuid::new_v4(),
            local_folder_path: local_folder_path.to_string(),
            collective_path: collective_path.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            files_uploaded: 0,
            files_downloaded: 0,
            files_unchanged: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, path: &str, reason: impl ToString) {
        self.failures.push(FileFailure {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> usize {
        self.files_uploaded + self.files_downloaded + self.files_unchanged
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of actual file writes performed, local or remote.
    pub fn total_writes(&self) -> usize {
        self.files_uploaded + self.files_downloaded
    }
}

/// What a trigger got back from the orchestrator.
#[derive(Debug)]
pub enum SyncOutcome {
    /// A pass ran to completion (possibly with per-file failures).
    Completed(PassReport),
    /// A pass was already in flight; this trigger was folded into the
    /// follow-up pass the in-flight runner will execute.
    Coalesced,
    /// No valid remote connection is configured; no pass started.
    NotConnected,
    /// The pass was cancelled between files.
    Cancelled,
    /// A connection-scope error aborted the pass.
    Failed(String),
}
