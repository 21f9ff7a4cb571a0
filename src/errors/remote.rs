use thiserror::Error;

use super::{AppError, ErrorCategory, ErrorSeverity};

/// Errors surfaced by remote storage operations (WebDAV or any other backend).
///
/// `NotFound` and `AlreadyExists` are part of the normal control flow: a stat
/// on a missing path and a create racing another writer both land here and are
/// tolerated by the callers that expect them. Everything else is a real
/// failure; `is_connection_error` separates the ones that abort a whole pass.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote path not found: {path}")]
    NotFound { path: String },

    #[error("Remote path already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Authentication failed for '{url}'")]
    Unauthorized { url: String },

    #[error("Network error talking to '{url}': {details}")]
    Network { url: String, details: String },

    #[error("Request to '{url}' timed out after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Server error from '{url}': HTTP {status}")]
    Server { url: String, status: u16 },

    #[error("Unexpected response for '{path}': HTTP {status}")]
    Unexpected { path: String, status: u16 },

    #[error("Malformed server response for '{path}': {details}")]
    Protocol { path: String, details: String },
}

impl RemoteError {
    pub fn not_found<S: Into<String>>(path: S) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn already_exists<S: Into<String>>(path: S) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    pub fn protocol<S: Into<String>>(path: S, details: S) -> Self {
        Self::Protocol {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, RemoteError::AlreadyExists { .. })
    }

    /// Connection-scope failures abort the current pass; everything else is
    /// handled per file.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            RemoteError::Unauthorized { .. }
                | RemoteError::Network { .. }
                | RemoteError::Timeout { .. }
                | RemoteError::Server { .. }
        )
    }
}

impl AppError for RemoteError {
    fn user_message(&self) -> String {
        match self {
            RemoteError::NotFound { .. } => "Remote file or folder not found".to_string(),
            RemoteError::AlreadyExists { .. } => "Remote folder already exists".to_string(),
            RemoteError::Unauthorized { .. } => {
                "Authentication failed - please check credentials".to_string()
            }
            RemoteError::Network { .. } => "Unable to reach the server".to_string(),
            RemoteError::Timeout { .. } => "Connection timed out".to_string(),
            RemoteError::Server { .. } => "Server returned an error".to_string(),
            RemoteError::Unexpected { .. } => "Server returned an unexpected response".to_string(),
            RemoteError::Protocol { .. } => "Server response could not be parsed".to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RemoteError::NotFound { .. } => "REMOTE_NOT_FOUND",
            RemoteError::AlreadyExists { .. } => "REMOTE_ALREADY_EXISTS",
            RemoteError::Unauthorized { .. } => "REMOTE_AUTH_FAILED",
            RemoteError::Network { .. } => "REMOTE_NETWORK_ERROR",
            RemoteError::Timeout { .. } => "REMOTE_TIMEOUT",
            RemoteError::Server { .. } => "REMOTE_SERVER_ERROR",
            RemoteError::Unexpected { .. } => "REMOTE_UNEXPECTED_STATUS",
            RemoteError::Protocol { .. } => "REMOTE_PROTOCOL_ERROR",
        }
    }

    fn error_category(&self) -> ErrorCategory {
        match self {
            RemoteError::Unauthorized { .. } => ErrorCategory::Auth,
            RemoteError::Network { .. } | RemoteError::Timeout { .. } | RemoteError::Server { .. } => {
                ErrorCategory::Network
            }
            RemoteError::Protocol { .. } | RemoteError::Unexpected { .. } => ErrorCategory::Protocol,
            RemoteError::NotFound { .. } | RemoteError::AlreadyExists { .. } => {
                ErrorCategory::FileSystem
            }
        }
    }

    fn error_severity(&self) -> ErrorSeverity {
        match self {
            RemoteError::Unauthorized { .. } => ErrorSeverity::Critical,
            RemoteError::Network { .. } | RemoteError::Timeout { .. } | RemoteError::Server { .. } => {
                ErrorSeverity::Important
            }
            RemoteError::NotFound { .. } | RemoteError::AlreadyExists { .. } => ErrorSeverity::Expected,
            _ => ErrorSeverity::Minor,
        }
    }

    fn suggested_action(&self) -> Option<String> {
        match self {
            RemoteError::Unauthorized { .. } => {
                Some("Verify username and password or re-run the login flow".to_string())
            }
            RemoteError::Network { .. } | RemoteError::Timeout { .. } => {
                Some("Check network connectivity and server URL".to_string())
            }
            _ => None,
        }
    }
}
