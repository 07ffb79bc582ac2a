//! Descriptor source implementations.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{DescriptorRecord, DescriptorSource, ResourceDescriptor};
use crate::error::ResolveError;

const DESCRIPTOR_EXT: &str = "json";

/// Reads `<dir>/<name>.json` side-car descriptors. Re-reads the file on every lookup.
#[derive(Debug, Clone)]
pub struct DirDescriptorSource {
    dir: PathBuf,
}

impl DirDescriptorSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the descriptor file for `name` (exists or not).
    pub fn descriptor_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{DESCRIPTOR_EXT}"))
    }

    /// All registered resource names, sorted. A missing directory means no names.
    pub fn names(&self) -> io::Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DESCRIPTOR_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// A resource name must be a single, non-hidden path component.
fn validate_name(name: &str) -> Result<(), ResolveError> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if bad {
        return Err(ResolveError::InvalidDescriptor {
            name: name.to_string(),
            reason: "resource name must be a single path component".to_string(),
        });
    }
    Ok(())
}

impl DescriptorSource for DirDescriptorSource {
    fn get(&self, name: &str) -> Result<ResourceDescriptor, ResolveError> {
        validate_name(name)?;
        let path = self.descriptor_path(name);
        let data = match fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ResolveError::NotFound {
                    name: name.to_string(),
                })
            }
            Err(source) => {
                return Err(ResolveError::Io {
                    context: format!("read descriptor {}", path.display()),
                    source,
                })
            }
        };
        let record: DescriptorRecord =
            serde_json::from_str(&data).map_err(|e| ResolveError::InvalidDescriptor {
                name: name.to_string(),
                reason: format!("{}: {}", path.display(), e),
            })?;
        ResourceDescriptor::from_record(name, record)
    }
}

/// In-memory descriptor map, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryDescriptorSource {
    entries: RwLock<HashMap<String, ResourceDescriptor>>,
}

impl MemoryDescriptorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the descriptor for `name`.
    pub fn insert(&self, name: impl Into<String>, descriptor: ResourceDescriptor) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), descriptor);
    }

    pub fn remove(&self, name: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
    }
}

impl DescriptorSource for MemoryDescriptorSource {
    fn get(&self, name: &str) -> Result<ResourceDescriptor, ResolveError> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound {
                name: name.to_string(),
            })
    }
}
