//! User configuration
//!
//! Stores preferences in `~/.config/rowwatch/config.yaml`

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::watcher::{WatchOptions, DEFAULT_DEBOUNCE};

/// Preferences read once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Reload the loaded file when it changes on disk
    #[serde(default = "default_true")]
    pub live_reload: bool,

    /// Ask for confirmation before loading a file
    #[serde(default = "default_true")]
    pub confirm_load: bool,

    /// Quiet period that ends a burst of change notifications
    #[serde(default = "default_debounce_ms")]
    pub reload_debounce_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            live_reload: true,
            confirm_load: true,
            reload_debounce_ms: default_debounce_ms(),
        }
    }
}

impl AppConfig {
    /// Load config from the default location, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from `path`, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to `path`
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            debounce: Duration::from_millis(self.reload_debounce_ms),
        }
    }
}
