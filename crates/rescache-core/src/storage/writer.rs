//! Sequential writer for a staging download file.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writer for a `.part` staging file. Bytes are appended in arrival order;
/// `finalize` renames the file to its staged name once the transfer is complete.
pub struct StorageWriter {
    file: File,
    temp_path: PathBuf,
    written: u64,
}

impl StorageWriter {
    /// Create a new temp file at `temp_path` (e.g. `<key>.part`).
    /// Overwrites if the path already exists.
    pub fn create(temp_path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)?;
        Ok(StorageWriter {
            file,
            temp_path: temp_path.to_path_buf(),
            written: 0,
        })
    }

    /// Append `data` at the current end of the file.
    pub fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Number of bytes appended so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Sync file data to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Path to the current temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically rename the temp file to `final_path`. Consumes the writer and closes the file.
    /// Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> io::Result<()> {
        let StorageWriter {
            file, temp_path, ..
        } = self;
        drop(file);
        std::fs::rename(&temp_path, final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::temp_path;

    #[test]
    fn append_sync_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("output.bin");
        let tp = temp_path(&final_path);

        let mut writer = StorageWriter::create(&tp).unwrap();
        writer.append(b"hello ").unwrap();
        writer.append(b"world").unwrap();
        assert_eq!(writer.written(), 11);
        assert_eq!(writer.temp_path(), tp.as_path());
        writer.sync().unwrap();
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"hello world");
    }

    #[test]
    fn create_truncates_leftover() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("x.part");
        std::fs::write(&tp, b"stale bytes from a crashed run").unwrap();
        let mut writer = StorageWriter::create(&tp).unwrap();
        writer.append(b"new").unwrap();
        let final_path = dir.path().join("x");
        writer.finalize(&final_path).unwrap();
        assert_eq!(std::fs::read(&final_path).unwrap(), b"new");
    }
}
