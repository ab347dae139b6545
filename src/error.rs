//! Errors surfaced at the session boundary

use std::io;
use std::path::PathBuf;

use crate::codec::DecodeError;
use crate::watcher::WatchError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Path does not exist or is a directory
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// A file is loaded; it must be unloaded first
    #[error("{} is already loaded", .0.display())]
    AlreadyLoaded(PathBuf),
    #[error("no data loaded")]
    NoDataLoaded,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    WatchRegistration(#[from] WatchError),
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    /// Message shown at the prompt
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound(_) => "File not found.".to_string(),
            Self::AlreadyLoaded(_) => "A file is already loaded. Unload it first.".to_string(),
            Self::NoDataLoaded => "No data loaded.".to_string(),
            Self::Decode(e) => format!("Error loading CSV: {}", e),
            Self::WatchRegistration(e) => format!("Live reload unavailable: {}", e),
            Self::Write { source, .. } => format!("Failed to save file: {}", source),
        }
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
