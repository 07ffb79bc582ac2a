//! Advisory per-key commit lock (cross-process), via `fs4`.

use fs4::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Held for the duration of a commit or a hit verification; released when dropped.
#[derive(Debug)]
pub(crate) struct KeyLock {
    _file: File,
}

impl KeyLock {
    /// Block until the exclusive (commit) lock at `path` is acquired.
    pub(crate) fn acquire(path: &Path) -> io::Result<Self> {
        let file = open_lock_file(path)?;
        FileExt::lock_exclusive(&file)?;
        tracing::debug!(lock = %path.display(), "acquired commit lock");
        Ok(KeyLock { _file: file })
    }

    /// Block until a shared (reader) lock is acquired; excludes commits only.
    pub(crate) fn acquire_shared(path: &Path) -> io::Result<Self> {
        let file = open_lock_file(path)?;
        FileExt::lock_shared(&file)?;
        Ok(KeyLock { _file: file })
    }
}

fn open_lock_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
}
