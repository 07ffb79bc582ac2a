//! Checksum command: digest of a file or directory.

use anyhow::{Context, Result};
use rescache_core::checksum;
use std::path::Path;

/// Print the digest in `sha256sum` layout.
pub fn run_checksum(path: &Path) -> Result<()> {
    let digest =
        checksum::digest_path(path).with_context(|| format!("digest {}", path.display()))?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
