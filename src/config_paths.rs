//! Centralized configuration paths for rowwatch
//!
//! All config files live under:
//! - Unix/macOS: `~/.config/rowwatch/`
//! - Windows: `%APPDATA%\rowwatch\`

use std::{env, fs, path::PathBuf};

const APP_DIR: &str = "rowwatch";

/// Base config directory for rowwatch
///
/// Unix/macOS:
///   - If XDG_CONFIG_HOME is set: `$XDG_CONFIG_HOME/rowwatch`
///   - Else: `~/.config/rowwatch`
///
/// Windows:
///   - `%APPDATA%\rowwatch`
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join(APP_DIR))
    }

    #[cfg(not(target_os = "windows"))]
    {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .map(|config| config.join(APP_DIR))
    }
}

/// `~/.config/rowwatch/config.yaml`
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

/// `~/.config/rowwatch/logs/`
pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

/// Create the logs directory if needed and return it
pub fn ensure_logs_dir() -> std::io::Result<PathBuf> {
    let dir = logs_dir().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no config directory available")
    })?;
    fs::create_dir_all(&dir)?;
    Ok(dir)
}
