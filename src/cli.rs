//! Command-line argument parsing
//!
//! Supports:
//! - Loading a file at startup
//! - Skipping the load confirmation
//! - Turning live reload off
//! - An alternate config file

use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

/// In-memory CSV rows kept in sync with their file
#[derive(Parser, Debug)]
#[command(
    name = "rowwatch",
    version,
    about = "In-memory CSV rows kept in sync with their file"
)]
pub struct CliArgs {
    /// CSV file to load at startup
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Load without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Do not reload the file when it changes on disk
    #[arg(long)]
    pub no_watch: bool,

    /// Read configuration from PATH instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Read the config file and apply flag overrides
    pub fn load_config(&self) -> AppConfig {
        let config = match &self.config {
            Some(path) => AppConfig::load_from(path),
            None => AppConfig::load(),
        };
        self.apply(config)
    }

    /// Flags win over the config file
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if self.yes {
            config.confirm_load = false;
        }
        if self.no_watch {
            config.live_reload = false;
        }
        config
    }
}
