use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::errors::CliError;
use crate::output::OutputMode;

fn env_filter(output: &OutputMode) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(output.log_level()))
}

/// Diagnostics for line-oriented commands go to stderr.
pub fn init_stderr(output: &OutputMode) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(output))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// The TUI owns the terminal, so its diagnostics are appended to a file instead.
pub fn init_file(output: &OutputMode) -> Result<PathBuf, CliError> {
    let path = tui_log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(output))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
    Ok(path)
}

pub fn tui_log_path() -> Result<PathBuf, CliError> {
    let base = dirs::cache_dir().ok_or_else(|| {
        CliError::Generic("Could not resolve cache directory for this OS.".to_string())
    })?;
    Ok(base.join("resumax").join("tui.log"))
}
