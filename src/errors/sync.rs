use thiserror::Error;

use super::{AppError, ErrorCategory, ErrorSeverity, RemoteError};

/// Errors raised by the synchronization engine itself.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No remote connection configured")]
    NotConnected,

    #[error("Invalid sync configuration: {details}")]
    ConfigurationInvalid { details: String },

    #[error("Remote path '{path}' is not under the collective root '{root}'")]
    PathMapping { path: String, root: String },

    #[error("Vault error on '{path}': {source}")]
    Vault {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Sync pass cancelled")]
    Cancelled,
}

impl SyncError {
    pub fn configuration_invalid<S: Into<String>>(details: S) -> Self {
        Self::ConfigurationInvalid {
            details: details.into(),
        }
    }

    pub fn path_mapping<S: Into<String>>(path: S, root: S) -> Self {
        Self::PathMapping {
            path: path.into(),
            root: root.into(),
        }
    }

    pub fn vault<S: Into<String>>(path: S, source: std::io::Error) -> Self {
        Self::Vault {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the current pass instead of being
    /// recorded against a single file.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Remote(remote) => remote.is_connection_error(),
            SyncError::NotConnected
            | SyncError::ConfigurationInvalid { .. }
            | SyncError::Cancelled => true,
            SyncError::PathMapping { .. } | SyncError::Vault { .. } => false,
        }
    }
}

impl AppError for SyncError {
    fn user_message(&self) -> String {
        match self {
            SyncError::NotConnected => "Not connected to a collective server".to_string(),
            SyncError::ConfigurationInvalid { details } => {
                format!("Invalid configuration: {}", details)
            }
            SyncError::PathMapping { path, .. } => {
                format!("Could not map remote path '{}'", path)
            }
            SyncError::Vault { path, .. } => format!("Local file error on '{}'", path),
            SyncError::Remote(remote) => remote.user_message(),
            SyncError::Cancelled => "Sync was cancelled".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            SyncError::NotConnected => "SYNC_NOT_CONNECTED",
            SyncError::ConfigurationInvalid { .. } => "SYNC_CONFIG_INVALID",
            SyncError::PathMapping { .. } => "SYNC_PATH_MAPPING",
            SyncError::Vault { .. } => "SYNC_VAULT_ERROR",
            SyncError::Remote(remote) => remote.error_code(),
            SyncError::Cancelled => "SYNC_CANCELLED",
        }
    }

    fn error_category(&self) -> ErrorCategory {
        match self {
            SyncError::NotConnected | SyncError::ConfigurationInvalid { .. } => ErrorCategory::Config,
            SyncError::PathMapping { .. } => ErrorCategory::Protocol,
            SyncError::Vault { .. } => ErrorCategory::FileSystem,
            SyncError::Remote(remote) => remote.error_category(),
            SyncError::Cancelled => ErrorCategory::Config,
        }
    }

    fn error_severity(&self) -> ErrorSeverity {
        match self {
            SyncError::ConfigurationInvalid { .. } => ErrorSeverity::Critical,
            SyncError::NotConnected => ErrorSeverity::Important,
            SyncError::Remote(remote) => remote.error_severity(),
            SyncError::Cancelled => ErrorSeverity::Expected,
            _ => ErrorSeverity::Minor,
        }
    }

    fn suggested_action(&self) -> Option<String> {
        match self {
            SyncError::NotConnected => {
                Some("Configure the server URL and credentials, then retry".to_string())
            }
            SyncError::Remote(remote) => remote.suggested_action(),
            _ => None,
        }
    }
}
