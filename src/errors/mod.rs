/// Common trait for all custom error types in the application
pub trait AppError: std::error::Error + Send + Sync + 'static {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get the stable error code for host/frontend handling
    fn error_code(&self) -> &'static str;

    /// Get the error category for status reporting
    fn error_category(&self) -> ErrorCategory;

    /// Get the error severity for status reporting
    fn error_severity(&self) -> ErrorSeverity;

    /// Get optional suggested action for the user
    fn suggested_action(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Auth,
    Config,
    FileSystem,
    Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Routine outcomes surfaced as errors (benign races, busy signals)
    Expected,
    Minor,
    Important,
    Critical,
}

// Submodules for domain-specific errors
pub mod remote;
pub mod sync;

pub use remote::RemoteError;
pub use sync::SyncError;
