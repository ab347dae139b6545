//! Live reload of the loaded file
//!
//! Uses the `notify` crate to watch the directory that contains the loaded
//! file. A background thread blocks on the notification channel, coalesces
//! bursts of events, and when the file's content changed decodes it again and
//! swaps the result into the shared store.
//!
//! Cancellation is cooperative: `stop` raises a flag and pushes a `Shutdown`
//! message into the same channel so a blocked receive wakes up, then joins the
//! thread. The flag is checked after every wakeup, never mid-reload.

use notify::event::{EventKind, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::codec::{self, DecodeError};
use crate::store::SharedStore;

/// Quiet period that ends a burst of events (truncate + write of one save)
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Outcome of a change detected on disk
#[derive(Debug)]
pub enum ReloadEvent {
    /// The file was decoded and the store replaced
    Reloaded { path: PathBuf, rows: usize },
    /// Decoding failed; the previous store is still current
    Failed { path: PathBuf, error: DecodeError },
    /// The file was deleted; no further reloads until the next load
    Detached { path: PathBuf },
}

/// Callback invoked from the watcher thread for every reload outcome
pub type ReloadListener = Arc<dyn Fn(&ReloadEvent) + Send + Sync>;

/// A listener that only relies on the log
pub fn silent_listener() -> ReloadListener {
    Arc::new(|_: &ReloadEvent| {})
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("{} has no file name", .0.display())]
    NoFileName(PathBuf),
    #[error("cannot watch {}: {source}", .dir.display())]
    Register {
        dir: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("cannot start watcher thread: {0}")]
    Spawn(#[source] io::Error),
}

enum Signal {
    Fs(notify::Result<notify::Event>),
    Shutdown,
}

/// Handle to a running watcher thread
///
/// Dropping the handle stops the thread and waits for it.
pub struct FileWatcher {
    path: PathBuf,
    cancel: Arc<AtomicBool>,
    tx: Sender<Signal>,
    watcher: Option<RecommendedWatcher>,
    thread: Option<JoinHandle<()>>,
}

impl FileWatcher {
    /// Register a watch on `path`'s directory and start the reload thread
    ///
    /// Registration happens before this returns, so any write made afterwards
    /// is observed.
    pub fn spawn(
        path: &Path,
        store: SharedStore,
        options: WatchOptions,
        listener: ReloadListener,
    ) -> Result<Self, WatchError> {
        let file_name = path
            .file_name()
            .ok_or_else(|| WatchError::NoFileName(path.to_path_buf()))?
            .to_os_string();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, rx) = mpsc::channel();
        let fs_tx = tx.clone();
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                let _ = fs_tx.send(Signal::Fs(res));
            })
            .map_err(|source| WatchError::Register {
                dir: dir.clone(),
                source,
            })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Register {
                dir: dir.clone(),
                source,
            })?;

        let cancel = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            path: path.to_path_buf(),
            file_name,
            store,
            options,
            listener,
            cancel: Arc::clone(&cancel),
            detached: false,
        };
        let thread = thread::Builder::new()
            .name("rowwatch-watcher".to_string())
            .spawn(move || worker.run(rx))
            .map_err(WatchError::Spawn)?;

        tracing::info!("Started file watcher for: {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            cancel,
            tx,
            watcher: Some(watcher),
            thread: Some(thread),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False once the thread has exited
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the thread and wait for it to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.cancel.store(true, Ordering::SeqCst);
        let _ = self.tx.send(Signal::Shutdown);
        // Unregisters the directory watch and drops the notify sender.
        self.watcher.take();

        if thread.join().is_err() {
            tracing::warn!("File watcher thread for {} panicked", self.path.display());
        }
        tracing::info!("Stopped file watcher for: {}", self.path.display());
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("path", &self.path)
            .field("running", &self.is_running())
            .finish()
    }
}

/// What one burst of notifications amounted to
#[derive(Debug, Default)]
struct Batch {
    modified: bool,
    removed: bool,
    shutdown: bool,
}

impl Batch {
    /// Fold one signal into the batch. Returns true if it concerned the
    /// watched file.
    fn absorb(&mut self, signal: Signal, file_name: &OsString) -> bool {
        let event = match signal {
            Signal::Shutdown => {
                self.shutdown = true;
                return false;
            }
            Signal::Fs(Err(e)) => {
                tracing::warn!("File watcher error: {:?}", e);
                return false;
            }
            Signal::Fs(Ok(event)) => event,
        };

        if !event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
        {
            return false;
        }

        match event.kind {
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => {
                self.modified = true;
                true
            }
            EventKind::Remove(_) => {
                self.removed = true;
                true
            }
            _ => false,
        }
    }
}

struct Worker {
    path: PathBuf,
    file_name: OsString,
    store: SharedStore,
    options: WatchOptions,
    listener: ReloadListener,
    cancel: Arc<AtomicBool>,
    detached: bool,
}

impl Worker {
    fn run(mut self, rx: Receiver<Signal>) {
        tracing::debug!("Watcher thread running for {}", self.path.display());

        // The first wait of every batch is unbounded.
        while let Ok(first) = rx.recv() {
            let mut batch = Batch::default();
            batch.absorb(first, &self.file_name);
            let mut deadline = Instant::now() + self.options.debounce;

            while !batch.shutdown && (batch.modified || batch.removed) {
                let wait = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(signal) => {
                        if batch.absorb(signal, &self.file_name) {
                            deadline = Instant::now() + self.options.debounce;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => batch.shutdown = true,
                }
            }

            if batch.shutdown || self.cancel.load(Ordering::SeqCst) {
                break;
            }
            self.apply(&batch);
        }

        tracing::debug!("Watcher thread exiting for {}", self.path.display());
    }

    fn apply(&mut self, batch: &Batch) {
        if self.detached || !(batch.modified || batch.removed) {
            return;
        }
        // A remove followed by a re-create within one burst is a replace.
        if batch.removed && !self.path.exists() {
            self.detach();
            return;
        }
        self.reload();
    }

    fn reload(&mut self) {
        tracing::info!("Detected change to {}, reloading", self.path.display());

        match codec::decode_file(&self.path) {
            Ok(store) => {
                let rows = store.len();
                self.store.replace(store);
                tracing::info!("Reloaded {} rows from {}", rows, self.path.display());
                (self.listener)(&ReloadEvent::Reloaded {
                    path: self.path.clone(),
                    rows,
                });
            }
            Err(error) if error.is_not_found() => self.detach(),
            Err(error) => {
                tracing::warn!(
                    "Reload of {} failed, keeping previous data: {}",
                    self.path.display(),
                    error
                );
                (self.listener)(&ReloadEvent::Failed {
                    path: self.path.clone(),
                    error,
                });
            }
        }
    }

    fn detach(&mut self) {
        self.detached = true;
        tracing::warn!(
            "{} was removed; live reload suspended until it is loaded again",
            self.path.display()
        );
        (self.listener)(&ReloadEvent::Detached {
            path: self.path.clone(),
        });
    }
}
