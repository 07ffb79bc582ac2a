//! Logging setup. Events go to `$XDG_STATE_HOME/rescache/rescache.log`, or to
//! stderr when the state directory cannot be used.
//!
//! The filter comes from `RESCACHE_LOG`, then `RUST_LOG`, then a default that
//! keeps the crate's own cache hit/miss/commit events at debug.

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RESCACHE_LOG";
const DEFAULT_FILTER: &str = "info,rescache=debug,rescache_core=debug";
const LOG_FILE: &str = "rescache.log";

/// Where log events are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to this file (parent directories are created).
    File(PathBuf),
    Stderr,
}

/// `$XDG_STATE_HOME/rescache/rescache.log`.
pub fn default_log_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::new()?;
    Ok(xdg_dirs.get_state_home().join("rescache").join(LOG_FILE))
}

fn filter_directives() -> String {
    [LOG_ENV, "RUST_LOG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_new(filter_directives()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Install the global subscriber for `target`. Errors if the log file cannot be
/// opened or a subscriber is already installed.
pub fn init(target: &LogTarget) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false);
    match target {
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            builder
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            tracing::info!("rescache logging initialized at {}", path.display());
        }
        LogTarget::Stderr => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("{}", e))?;
        }
    }
    Ok(())
}

/// Log to the default file. On failure (e.g. state dir unwritable) the caller
/// can fall back to `init_logging_stderr`.
pub fn init_logging() -> Result<PathBuf> {
    let path = default_log_path()?;
    init(&LogTarget::File(path.clone()))?;
    Ok(path)
}

/// Log to stderr only. Never fails; a second initialization is ignored.
pub fn init_logging_stderr() {
    let _ = init(&LogTarget::Stderr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_path_ends_with_app_file() {
        let p = default_log_path().unwrap();
        assert!(p.ends_with(Path::new("rescache").join(LOG_FILE)));
    }

    #[test]
    fn default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn log_file_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/rescache/rescache.log");
        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }
}
