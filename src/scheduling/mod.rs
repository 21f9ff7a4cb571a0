pub mod scheduler;
pub mod watcher;

pub use scheduler::SyncScheduler;
pub use watcher::watch_vault;
