//! Tracing setup for the engine and CLI.
//!
//! Events go to `$XDG_STATE_HOME/mdl/mdl.log` (appended, no ANSI colours).
//! When that file cannot be opened the caller falls back to stderr. The
//! filter comes from `RUST_LOG`, else [`DEFAULT_FILTER`].

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info,mdl_core=debug";

const LOG_FILE_NAME: &str = "mdl.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Where [`init_logging`] writes: `<state dir>/mdl/mdl.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("mdl").context("resolve XDG state dir")?;
    Ok(dirs.get_state_home().join(LOG_FILE_NAME))
}

/// Create the parent directory and open `path` for appending.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber writing to the state-dir log file.
///
/// Fails if the file cannot be opened or a subscriber is already set; the
/// CLI then calls [`init_logging_stderr`].
pub fn init_logging() -> Result<PathBuf> {
    let path = log_file_path()?;
    let file = open_log_file(&path).with_context(|| format!("open log file {}", path.display()))?;

    // Mutex<File> is a MakeWriter: each event locks, writes and releases.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))?;

    tracing::info!(path = %path.display(), "logging to file");
    Ok(path)
}

/// Install a stderr-only subscriber. Does nothing if one is already set.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init();
}
