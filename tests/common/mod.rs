//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rowwatch::{AppConfig, ReloadEvent, ReloadListener, Session};
use tempfile::TempDir;

/// Upper bound on how long a test waits for the watcher to react
pub const WAIT: Duration = Duration::from_secs(5);

/// Outcome of a reload, stripped down for comparisons
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Reloaded(usize),
    Failed,
    Detached,
}

/// A listener that forwards every reload outcome to a channel
pub fn channel_listener() -> (ReloadListener, Receiver<Seen>) {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let listener: ReloadListener = Arc::new(move |event: &ReloadEvent| {
        let seen = match event {
            ReloadEvent::Reloaded { rows, .. } => Seen::Reloaded(*rows),
            ReloadEvent::Failed { .. } => Seen::Failed,
            ReloadEvent::Detached { .. } => Seen::Detached,
        };
        if let Ok(tx) = tx.lock() {
            let _ = tx.send(seen);
        }
    });
    (listener, rx)
}

/// A watching session whose reload outcomes arrive on the returned channel
pub fn watching_session() -> (Session, Receiver<Seen>) {
    let (listener, events) = channel_listener();
    (Session::new(&AppConfig::default(), listener), events)
}

/// Temp directory holding `name` with `content`
pub fn csv_fixture(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write fixture");
    (dir, path)
}

/// Skip intermediate outcomes until `expected` arrives
pub fn wait_for(events: &Receiver<Seen>, expected: Seen) -> bool {
    let deadline = Instant::now() + WAIT;
    while let Ok(seen) = events.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        if seen == expected {
            return true;
        }
    }
    false
}

/// Poll `condition` until it holds or `WAIT` elapses
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// Rendered rows of a loaded session
pub fn printed(session: &Session) -> Vec<String> {
    session.print().expect("session should be loaded")
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("Failed to read file")
}
