//! Pluggable pre/post hooks around the cache, selected by resource type.
//!
//! `pre` runs on a freshly fetched payload inside the private staging
//! directory, before digest and commit; whatever it returns is what gets
//! verified and committed. `post` runs on the committed artifact right before
//! the path is handed back and never writes to the cache.

mod glove;
mod unpack;

pub use glove::{Glove, GLOVE_DIMENSIONS};
pub use unpack::Unpack;

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::descriptor::ResourceType;

pub trait Transform: Send + Sync {
    /// Post-download hook; output must stay inside the staging directory of `path`.
    fn pre(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    /// Pre-return hook applied to the committed artifact.
    fn post(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }
}

/// Returns paths unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {}

/// Post transform selecting one named child of a committed directory
/// (e.g. one word-vector dimension out of a bundle).
#[derive(Debug, Clone)]
pub struct Subdir(pub String);

impl Transform for Subdir {
    fn post(&self, path: &Path) -> Result<PathBuf> {
        let child = path.join(&self.0);
        if !child.exists() {
            bail!("{} has no entry named '{}'", path.display(), self.0);
        }
        Ok(child)
    }
}

/// Dataset archives that wrap their files in one top-level folder.
const DATASET_FOLDERS: &[(&str, &str)] = &[
    ("MSCOCO", "mscoco"),
    ("OpenSubtitles", "opensubtitles"),
    ("Ubuntu", "ubuntu_dataset"),
];

/// Maps resource-type names to transforms. Unregistered types get `Identity`.
#[derive(Clone)]
pub struct TransformRegistry {
    by_type: HashMap<String, Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// Registry with nothing registered: every type is identity.
    pub fn empty() -> Self {
        Self {
            by_type: HashMap::new(),
        }
    }

    /// `Plain` => identity, `Archive` => unpack a zip or `.tar.gz`, plus the
    /// dataset bundles: `MSCOCO`, `OpenSubtitles`, `Ubuntu` and `Glove<dim>`.
    pub fn with_defaults() -> Self {
        let mut reg = Self::empty();
        reg.register(ResourceType::Plain.as_str(), Arc::new(Identity));
        reg.register(ResourceType::Archive.as_str(), Arc::new(Unpack::default()));
        for (type_name, folder) in DATASET_FOLDERS {
            reg.register(*type_name, Arc::new(Unpack::with_subdir(*folder)));
        }
        for dim in GLOVE_DIMENSIONS {
            let glove = Glove::new(*dim);
            reg.register(glove.type_name(), Arc::new(glove));
        }
        reg
    }

    /// Register (or replace) the transform used for `resource_type`.
    pub fn register(&mut self, resource_type: impl Into<String>, transform: Arc<dyn Transform>) {
        self.by_type.insert(resource_type.into(), transform);
    }

    pub fn get(&self, resource_type: &ResourceType) -> Arc<dyn Transform> {
        match self.by_type.get(resource_type.as_str()) {
            Some(t) => Arc::clone(t),
            None => {
                tracing::debug!(
                    resource_type = %resource_type,
                    "no transform registered, using identity"
                );
                Arc::new(Identity)
            }
        }
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TransformRegistry")
            .field("types", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn identity_is_default_for_both_hooks() {
        let p = Path::new("/cache/coai");
        assert_eq!(Identity.pre(p).unwrap(), p);
        assert_eq!(Identity.post(p).unwrap(), p);
    }

    #[test]
    fn subdir_selects_child() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("300d")).unwrap();
        let t = Subdir("300d".to_string());
        assert_eq!(t.post(dir.path()).unwrap(), dir.path().join("300d"));
        assert_eq!(t.pre(dir.path()).unwrap(), dir.path());
        assert!(Subdir("50d".to_string()).post(dir.path()).is_err());
    }

    #[test]
    fn unknown_type_falls_back_to_identity() {
        let reg = TransformRegistry::with_defaults();
        let t = reg.get(&ResourceType::Other("Word2Vec".to_string()));
        let p = Path::new("/x/y");
        assert_eq!(t.post(p).unwrap(), p);
    }

    #[test]
    fn defaults_cover_dataset_bundles() {
        let names = format!("{:?}", TransformRegistry::with_defaults());
        for t in [
            "Plain",
            "Archive",
            "MSCOCO",
            "OpenSubtitles",
            "Ubuntu",
            "Glove50d",
            "Glove100d",
            "Glove200d",
            "Glove300d",
        ] {
            assert!(names.contains(&format!("\"{t}\"")), "{t} missing from {names}");
        }
    }

    #[test]
    fn register_overrides_by_type_name() {
        let mut reg = TransformRegistry::empty();
        reg.register("Glove300d", Arc::new(Subdir("300d".to_string())));
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("300d")).unwrap();
        let t = reg.get(&ResourceType::from("Glove300d"));
        assert_eq!(t.post(dir.path()).unwrap(), dir.path().join("300d"));
        assert!(format!("{:?}", reg).contains("Glove300d"));
    }
}
