//! Archive extraction inside the staging directory (zip or `.tar.gz`).

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::Transform;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = b"\x1f\x8b";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchiveFormat {
    Zip,
    TarGz,
}

/// Sniff the archive format from the leading bytes of `path`.
pub(crate) fn detect_format(path: &Path) -> Result<ArchiveFormat> {
    let mut head = Vec::with_capacity(4);
    File::open(path)
        .with_context(|| format!("open {}", path.display()))?
        .take(4)
        .read_to_end(&mut head)
        .with_context(|| format!("read {}", path.display()))?;

    if head.starts_with(ZIP_LOCAL_HEADER) || head.starts_with(ZIP_EMPTY_ARCHIVE) {
        Ok(ArchiveFormat::Zip)
    } else if head.starts_with(GZIP_MAGIC) {
        Ok(ArchiveFormat::TarGz)
    } else {
        bail!("{} is neither a zip nor a gzip archive", path.display())
    }
}

/// Extract `archive` into a fresh sibling directory and delete the archive.
///
/// The directory is named `.<archive name>.unpacked`, which can never equal
/// the archive's own name.
pub(crate) fn extract_beside(archive: &Path) -> Result<PathBuf> {
    if !archive.is_file() {
        bail!("{} is not an archive file", archive.display());
    }
    let parent = archive
        .parent()
        .with_context(|| format!("{} has no parent directory", archive.display()))?;
    let file_name = archive
        .file_name()
        .with_context(|| format!("{} has no file name", archive.display()))?;
    let mut dir_name = std::ffi::OsString::from(".");
    dir_name.push(file_name);
    dir_name.push(".unpacked");
    let out = parent.join(dir_name);
    fs::create_dir(&out).with_context(|| format!("create {}", out.display()))?;

    let format = detect_format(archive)?;
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    match format {
        ArchiveFormat::Zip => zip::ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(&out))
            .with_context(|| format!("unzip {}", archive.display()))?,
        ArchiveFormat::TarGz => tar::Archive::new(GzDecoder::new(file))
            .unpack(&out)
            .with_context(|| format!("unpack {}", archive.display()))?,
    }
    // Archive bytes are not part of the committed artifact.
    fs::remove_file(archive).with_context(|| format!("remove {}", archive.display()))?;
    tracing::debug!(
        archive = %archive.display(),
        out = %out.display(),
        ?format,
        "archive unpacked"
    );
    Ok(out)
}

/// Pre transform: unpack a zip or gzip-compressed tar archive and hand back
/// the extracted tree (or `subdir` of it) for digest and commit.
#[derive(Debug, Clone, Default)]
pub struct Unpack {
    pub subdir: Option<String>,
}

impl Unpack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit only `name` from inside the archive.
    pub fn with_subdir(name: impl Into<String>) -> Self {
        Self {
            subdir: Some(name.into()),
        }
    }
}

impl Transform for Unpack {
    fn pre(&self, path: &Path) -> Result<PathBuf> {
        let out = extract_beside(path)?;
        match &self.subdir {
            None => Ok(out),
            Some(name) => {
                let selected = out.join(name);
                if !selected.exists() {
                    bail!("archive {} has no entry '{}'", path.display(), name);
                }
                Ok(selected)
            }
        }
    }
}
