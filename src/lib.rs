//! rowwatch - in-memory CSV rows kept in sync with their file
//!
//! A file is decoded into an immutable [`RowStore`]. A [`Session`] owns the
//! loaded file and a background [`FileWatcher`] that swaps in a freshly
//! decoded store whenever the file's content changes on disk.

pub mod cli;
pub mod codec;
pub mod config;
pub mod config_paths;
pub mod error;
pub mod logging;
pub mod repl;
pub mod session;
pub mod store;
pub mod watcher;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::SessionError;
pub use repl::Repl;
pub use session::{LoadOutcome, Session, WatchStatus};
pub use store::{Record, RowStore, SharedStore};
pub use watcher::{FileWatcher, ReloadEvent, ReloadListener, WatchOptions};
