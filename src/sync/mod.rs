pub mod downloader;
pub mod ensure;
pub mod orchestrator;
pub mod paths;
pub mod uploader;

pub use downloader::ChangeDownloader;
pub use ensure::ensure_remote_directories;
pub use orchestrator::SyncOrchestrator;
pub use uploader::ChangeUploader;
