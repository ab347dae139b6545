//! Session controller
//!
//! Owns the one loaded file: its path, the shared snapshot of its rows and the
//! watcher keeping that snapshot current. At most one file is loaded at a
//! time; `unload` must come before the next `load`.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec;
use crate::config::AppConfig;
use crate::error::{Result, SessionError};
use crate::store::{RowStore, SharedStore};
use crate::watcher::{self, FileWatcher, ReloadListener, WatchError, WatchOptions};

/// Result of a `load` call that passed the precondition checks
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { rows: usize, watch: WatchStatus },
    /// The confirmation gate said no; nothing changed
    Cancelled,
}

/// Whether live reload is running for the loaded file
#[derive(Debug)]
pub enum WatchStatus {
    Active,
    /// Turned off by configuration
    Disabled,
    /// Registration failed; the file is loaded without live reload
    Failed(WatchError),
}

struct LoadedFile {
    path: PathBuf,
    store: SharedStore,
    watcher: Option<FileWatcher>,
}

enum State {
    Unloaded,
    Loaded(LoadedFile),
}

pub struct Session {
    state: State,
    live_reload: bool,
    watch_options: WatchOptions,
    listener: ReloadListener,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&AppConfig::default(), watcher::silent_listener())
    }
}

impl Session {
    pub fn new(config: &AppConfig, listener: ReloadListener) -> Self {
        Self {
            state: State::Unloaded,
            live_reload: config.live_reload,
            watch_options: config.watch_options(),
            listener,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, State::Loaded(_))
    }

    pub fn is_watching(&self) -> bool {
        match &self.state {
            State::Loaded(loaded) => loaded.watcher.as_ref().is_some_and(FileWatcher::is_running),
            State::Unloaded => false,
        }
    }

    /// Canonical path of the loaded file
    pub fn watched_file(&self) -> Option<&Path> {
        match &self.state {
            State::Loaded(loaded) => Some(&loaded.path),
            State::Unloaded => None,
        }
    }

    /// The current rows, if a file is loaded
    pub fn snapshot(&self) -> Option<Arc<RowStore>> {
        match &self.state {
            State::Loaded(loaded) => Some(loaded.store.snapshot()),
            State::Unloaded => None,
        }
    }

    /// Load `path` and start watching it
    ///
    /// `confirm` is asked only after the path has been checked, and may veto
    /// the load.
    pub fn load<F>(&mut self, path: &Path, confirm: F) -> Result<LoadOutcome>
    where
        F: FnOnce(&Path) -> bool,
    {
        if let State::Loaded(loaded) = &self.state {
            return Err(SessionError::AlreadyLoaded(loaded.path.clone()));
        }

        match fs::metadata(path) {
            Ok(meta) if !meta.is_dir() => {}
            _ => return Err(SessionError::FileNotFound(path.to_path_buf())),
        }

        if !confirm(path) {
            tracing::debug!("Load of {} cancelled", path.display());
            return Ok(LoadOutcome::Cancelled);
        }

        let path = fs::canonicalize(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => SessionError::FileNotFound(path.to_path_buf()),
            _ => SessionError::Decode(codec::DecodeError::Open {
                path: path.to_path_buf(),
                source: e,
            }),
        })?;

        let rows = codec::decode_file(&path)?;
        let row_count = rows.len();
        let store = SharedStore::new(rows);

        let (watcher, watch) = if self.live_reload {
            match FileWatcher::spawn(
                &path,
                store.clone(),
                self.watch_options,
                Arc::clone(&self.listener),
            ) {
                Ok(w) => (Some(w), WatchStatus::Active),
                Err(e) => {
                    tracing::warn!("Live reload unavailable for {}: {}", path.display(), e);
                    (None, WatchStatus::Failed(e))
                }
            }
        } else {
            (None, WatchStatus::Disabled)
        };

        tracing::info!("Loaded {} rows from {}", row_count, path.display());
        self.state = State::Loaded(LoadedFile {
            path,
            store,
            watcher,
        });

        Ok(LoadOutcome::Loaded {
            rows: row_count,
            watch,
        })
    }

    /// Write the current rows to `path`, or to the loaded file when `path` is
    /// `None` or blank
    ///
    /// The watcher keeps observing the loaded file even when saving elsewhere.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let State::Loaded(loaded) = &self.state else {
            return Err(SessionError::NoDataLoaded);
        };

        let target = match path {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => loaded.path.clone(),
        };
        let snapshot = loaded.store.snapshot();

        let write_err = |source| SessionError::Write {
            path: target.clone(),
            source,
        };
        let file = File::create(&target).map_err(write_err)?;
        codec::write(&snapshot, BufWriter::new(file)).map_err(write_err)?;

        tracing::info!("Saved {} rows to {}", snapshot.len(), target.display());
        Ok(target)
    }

    /// Stop the watcher, then drop the rows and the path
    pub fn unload(&mut self) -> Result<()> {
        let State::Loaded(loaded) = std::mem::replace(&mut self.state, State::Unloaded) else {
            return Err(SessionError::NoDataLoaded);
        };

        if let Some(watcher) = loaded.watcher {
            watcher.stop();
        }
        tracing::info!("Unloaded {}", loaded.path.display());
        Ok(())
    }

    /// `Row N: f1 | f2 | ...` for every record, N starting at 1
    pub fn print(&self) -> Result<Vec<String>> {
        let snapshot = self.snapshot().ok_or(SessionError::NoDataLoaded)?;
        Ok(snapshot
            .iter()
            .enumerate()
            .map(|(i, record)| format!("Row {}: {}", i + 1, record.join(" | ")))
            .collect())
    }

    /// Stop live reload and release the loaded file
    pub fn exit(&mut self) {
        if let State::Loaded(loaded) = std::mem::replace(&mut self.state, State::Unloaded) {
            if let Some(watcher) = loaded.watcher {
                watcher.stop();
            }
            tracing::debug!("Session closed with {} loaded", loaded.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_watch() -> Session {
        let config = AppConfig {
            live_reload: false,
            ..AppConfig::default()
        };
        Session::new(&config, watcher::silent_listener())
    }

    #[test]
    fn test_new_session_is_unloaded() {
        let session = Session::default();
        assert!(!session.is_loaded());
        assert!(!session.is_watching());
        assert!(session.watched_file().is_none());
        assert!(session.snapshot().is_none());
    }

    #[test]
    fn test_cancelled_load_leaves_state_unloaded() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b\n").unwrap();

        let mut session = no_watch();
        let outcome = session.load(&path, |_| false).unwrap();

        assert!(matches!(outcome, LoadOutcome::Cancelled));
        assert!(!session.is_loaded());
    }

    #[test]
    fn test_confirm_not_called_for_missing_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut asked = false;

        let mut session = no_watch();
        let result = session.load(&dir.path().join("missing.csv"), |_| {
            asked = true;
            true
        });

        assert!(matches!(result, Err(SessionError::FileNotFound(_))));
        assert!(!asked);
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let mut session = no_watch();

        let result = session.load(dir.path(), |_| true);

        assert!(matches!(result, Err(SessionError::FileNotFound(_))));
        assert!(!session.is_loaded());
    }

    #[test]
    fn test_live_reload_disabled_by_config() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("data.csv");
        fs::write(&path, "a\n").unwrap();

        let mut session = no_watch();
        let outcome = session.load(&path, |_| true).unwrap();

        assert!(matches!(
            outcome,
            LoadOutcome::Loaded {
                rows: 1,
                watch: WatchStatus::Disabled
            }
        ));
        assert!(session.is_loaded());
        assert!(!session.is_watching());
    }

    #[test]
    fn test_blank_save_path_targets_loaded_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b\r\nc,d").unwrap();

        let mut session = no_watch();
        session.load(&path, |_| true).unwrap();
        let written = session.save(Some(Path::new(""))).unwrap();

        assert_eq!(written, fs::canonicalize(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\nc,d\n");
    }

    #[test]
    fn test_exit_releases_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("data.csv");
        fs::write(&path, "a\n").unwrap();

        let mut session = Session::default();
        session.load(&path, |_| true).unwrap();
        session.exit();

        assert!(!session.is_loaded());
        assert!(!session.is_watching());
    }
}
