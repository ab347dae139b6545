use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;

use rowwatch::cli::CliArgs;
use rowwatch::repl::PROMPT;
use rowwatch::{logging, ReloadEvent, ReloadListener, Repl, Session};

/// Report background reloads on the console, then restore the prompt
fn console_listener() -> ReloadListener {
    Arc::new(|event: &ReloadEvent| {
        let message = match event {
            ReloadEvent::Reloaded { rows, .. } => {
                format!("[watcher] Detected file change. Reloaded {} rows.", rows)
            }
            ReloadEvent::Failed { error, .. } => {
                format!("[watcher] Reload failed, keeping previous data: {}", error)
            }
            ReloadEvent::Detached { path } => format!(
                "[watcher] {} was removed. Live reload stopped until it is loaded again.",
                path.display()
            ),
        };
        let mut stdout = io::stdout().lock();
        let _ = write!(stdout, "\n{}\n{}", message, PROMPT);
        let _ = stdout.flush();
    })
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    logging::init();

    let config = args.load_config();
    tracing::debug!("Effective config: {:?}", config);

    let session = Session::new(&config, console_listener());
    let stdin = io::stdin().lock();
    let stdout = io::stdout();
    let mut repl = Repl::new(session, stdin, stdout, config.confirm_load);

    if let Some(path) = &args.file {
        repl.load_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }

    repl.run().context("Terminal I/O failed")?;
    Ok(())
}
