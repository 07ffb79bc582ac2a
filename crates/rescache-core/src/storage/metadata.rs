//! Metadata side-car (`<key>.json`): the authoritative cache-hit record.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{sync_dir, temp_path};
use crate::error::ResolveError;

/// Contents of a metadata side-car.
///
/// Named resources record only `local_path`; anonymous URL entries also
/// record the digest computed on first fetch so later hits can be verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub local_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl CacheMetadata {
    pub fn new(local_path: PathBuf) -> Self {
        Self {
            local_path,
            digest: None,
        }
    }
}

/// Read and parse a side-car. Missing file is an `Io` error; unparseable is `CorruptCache`.
pub(crate) fn read(path: &Path) -> Result<CacheMetadata, ResolveError> {
    let data = fs::read_to_string(path).map_err(|source| ResolveError::Io {
        context: format!("read metadata {}", path.display()),
        source,
    })?;
    let meta: CacheMetadata =
        serde_json::from_str(&data).map_err(|e| ResolveError::CorruptCache {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if meta.local_path.as_os_str().is_empty() {
        return Err(ResolveError::CorruptCache {
            path: path.to_path_buf(),
            reason: "empty local_path".to_string(),
        });
    }
    Ok(meta)
}

/// Write a side-car durably: `<key>.json.part`, fsync, rename, fsync the directory.
pub(crate) fn write(path: &Path, meta: &CacheMetadata) -> io::Result<()> {
    let json = serde_json::to_string_pretty(meta).map_err(io::Error::from)?;
    let tmp = temp_path(path);
    {
        let mut f = File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        f.write_all(b"\n")?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    if let Some(parent) = path.parent() {
        sync_dir(parent)?;
    }
    Ok(())
}
