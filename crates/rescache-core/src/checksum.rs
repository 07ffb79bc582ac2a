//! Content digests (SHA-256) for cached artifacts.
//!
//! A single file hashes to the plain SHA-256 of its bytes, so a descriptor
//! hashtag can be produced with `sha256sum`. A directory hashes to a SHA-256
//! over a canonical walk of the tree: entries are visited in sorted path
//! order and every entry contributes its kind, its relative path, and (for
//! files) its length and contents. Renaming or moving a file inside the tree
//! changes the digest; the order in which the filesystem lists entries does not.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use walkdir::WalkDir;

const BUF_SIZE: usize = 64 * 1024;

/// Domain tag so a directory can never collide with a file holding the same bytes.
const DIR_TAG: &[u8] = b"rescache-dir-v1\0";

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hash_file_into(path, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Digest of a file or a whole directory tree, as lowercase hex.
///
/// Pure: reads only, safe to call concurrently on different paths.
pub fn digest_path(path: &Path) -> io::Result<String> {
    let meta = fs::metadata(path)?;
    if meta.is_dir() {
        sha256_dir(path)
    } else {
        sha256_path(path)
    }
}

/// Compare two hex digests, ignoring case and surrounding whitespace.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual.trim())
}

fn sha256_dir(root: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(DIR_TAG);

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let rel = relative_key(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            hasher.update(b"D\0");
            hasher.update(rel.as_bytes());
            hasher.update(b"\0");
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            hasher.update(b"L\0");
            hasher.update(rel.as_bytes());
            hasher.update(b"\0");
            hasher.update(relative_key(&target).as_bytes());
            hasher.update(b"\0");
        } else {
            let len = entry.metadata().map_err(io::Error::from)?.len();
            hasher.update(b"F\0");
            hasher.update(rel.as_bytes());
            hasher.update(b"\0");
            hasher.update(len.to_le_bytes());
            hash_file_into(entry.path(), &mut hasher)?;
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Relative path with `/` separators regardless of platform.
fn relative_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn hash_file_into(path: &Path, hasher: &mut Sha256) -> io::Result<()> {
    let mut f = File::open(path)?;
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(())
}
