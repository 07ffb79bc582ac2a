//! Copy an already-local file or directory into staging (no network).

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use walkdir::WalkDir;

use super::FetchError;
use crate::control::AbortToken;
use crate::progress::ProgressObserver;
use crate::storage::temp_path;

const MIN_BUF_SIZE: usize = 4 * 1024;

/// Copies `src` into `dest` (via `dest.part`). Returns the number of file bytes copied.
pub(crate) fn copy_into(
    src: &Path,
    dest: &Path,
    buffer_size: usize,
    observer: &dyn ProgressObserver,
    abort: Option<&AbortToken>,
) -> Result<u64, FetchError> {
    let meta = fs::metadata(src).map_err(FetchError::Local)?;
    let part = temp_path(dest);
    let mut buf = vec![0u8; buffer_size.max(MIN_BUF_SIZE)];

    let copied = if meta.is_dir() {
        observer.on_start(None);
        copy_tree(src, &part, &mut buf, observer, abort)
    } else {
        observer.on_start(Some(meta.len()));
        copy_file(src, &part, &mut buf, observer, abort)
    };
    observer.on_finish();
    let copied = copied?;

    fs::rename(&part, dest).map_err(FetchError::Storage)?;
    tracing::debug!(src = %src.display(), bytes = copied, "local copy complete");
    Ok(copied)
}

fn copy_tree(
    src: &Path,
    dest: &Path,
    buf: &mut [u8],
    observer: &dyn ProgressObserver,
    abort: Option<&AbortToken>,
) -> Result<u64, FetchError> {
    let mut total = 0u64;
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| FetchError::Local(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| FetchError::Local(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        let target = dest.join(rel);
        let ft = entry.file_type();
        if ft.is_dir() {
            fs::create_dir_all(&target).map_err(FetchError::Storage)?;
        } else if ft.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            total += copy_file(entry.path(), &target, buf, observer, abort)?;
        }
    }
    Ok(total)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, target: &Path) -> Result<(), FetchError> {
    let link = fs::read_link(src).map_err(FetchError::Local)?;
    std::os::unix::fs::symlink(link, target).map_err(FetchError::Storage)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, target: &Path) -> Result<(), FetchError> {
    fs::copy(src, target).map_err(FetchError::Local)?;
    Ok(())
}

fn copy_file(
    src: &Path,
    dest: &Path,
    buf: &mut [u8],
    observer: &dyn ProgressObserver,
    abort: Option<&AbortToken>,
) -> Result<u64, FetchError> {
    let mut input = File::open(src).map_err(FetchError::Local)?;
    let mut output = File::create(dest).map_err(FetchError::Storage)?;
    let mut copied = 0u64;
    loop {
        if abort.map_or(false, AbortToken::is_aborted) {
            return Err(FetchError::Aborted);
        }
        let n = input.read(buf).map_err(FetchError::Local)?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n]).map_err(FetchError::Storage)?;
        copied += n as u64;
        observer.on_bytes(n as u64);
    }
    output.sync_all().map_err(FetchError::Storage)?;
    Ok(copied)
}
