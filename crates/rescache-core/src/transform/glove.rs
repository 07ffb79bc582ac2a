//! GloVe word-vector bundles.
//!
//! One download carries every dimension (`glove.6B.50d.txt`,
//! `glove.6B.300d.txt`, ...). `pre` regroups the files as `<dim>/glove.txt`
//! so the whole bundle is cached once; `post` hands back one dimension.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::unpack::extract_beside;
use super::Transform;

/// Dimensions published in the GloVe bundles, registered as `Glove<dim>`.
pub const GLOVE_DIMENSIONS: &[&str] = &["50d", "100d", "200d", "300d"];

const VECTORS_FILE: &str = "glove.txt";

#[derive(Debug, Clone)]
pub struct Glove {
    dimension: String,
}

impl Glove {
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
        }
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    /// Resource type name this transform is registered under (`Glove300d`).
    pub fn type_name(&self) -> String {
        format!("Glove{}", self.dimension)
    }
}

/// `glove.6B.300d.txt` => `300d`: the second-to-last dot-separated field.
fn dimension_of(file_name: &str) -> Option<&str> {
    let mut fields = file_name.rsplit('.');
    fields.next()?;
    fields.next().filter(|dim| !dim.is_empty())
}

impl Transform for Glove {
    fn pre(&self, path: &Path) -> Result<PathBuf> {
        let out = extract_beside(path)?;
        // Listed up front: the loop creates directories inside `out`.
        let entries = fs::read_dir(&out)
            .and_then(|dir| dir.collect::<std::io::Result<Vec<_>>>())
            .with_context(|| format!("read {}", out.display()))?;
        for entry in entries {
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(dim) = file_name.to_str().and_then(dimension_of) else {
                bail!(
                    "unexpected file {} in GloVe bundle",
                    entry.path().display()
                );
            };
            let dim_dir = out.join(dim);
            fs::create_dir_all(&dim_dir)
                .with_context(|| format!("create {}", dim_dir.display()))?;
            let target = dim_dir.join(VECTORS_FILE);
            fs::rename(entry.path(), &target)
                .with_context(|| format!("move {} to {}", entry.path().display(), target.display()))?;
            tracing::debug!(dimension = dim, "glove vectors regrouped");
        }
        Ok(out)
    }

    fn post(&self, path: &Path) -> Result<PathBuf> {
        let selected = path.join(&self.dimension);
        if !selected.join(VECTORS_FILE).is_file() {
            bail!(
                "{} has no {} vectors",
                path.display(),
                self.dimension
            );
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::unpack::tests::write_zip;

    #[test]
    fn dimension_from_file_name() {
        assert_eq!(dimension_of("glove.6B.300d.txt"), Some("300d"));
        assert_eq!(dimension_of("glove.50d.txt"), Some("50d"));
        assert_eq!(dimension_of("README"), None);
    }

    #[test]
    fn regroups_bundle_by_dimension() {
        let staging = tempfile::tempdir().unwrap();
        let archive = staging.path().join("glove");
        write_zip(
            &archive,
            &[
                ("glove.6B.50d.txt", b"the 0.1"),
                ("glove.6B.300d.txt", b"the 0.3"),
            ],
        );

        let t = Glove::new("300d");
        let out = t.pre(&archive).unwrap();
        assert_eq!(fs::read(out.join("50d/glove.txt")).unwrap(), b"the 0.1");
        assert_eq!(fs::read(out.join("300d/glove.txt")).unwrap(), b"the 0.3");
        assert!(!out.join("glove.6B.300d.txt").exists());

        assert_eq!(t.post(&out).unwrap(), out.join("300d"));
        assert_eq!(Glove::new("50d").post(&out).unwrap(), out.join("50d"));
        assert!(Glove::new("100d").post(&out).is_err());
        assert_eq!(t.type_name(), "Glove300d");
    }
}
