//! `rescache import` – side-load a local copy of a resource.

use anyhow::Result;
use rescache_core::ResourceResolver;
use std::path::Path;

pub fn run_import(resolver: &ResourceResolver, name: &str, path: &Path) -> Result<()> {
    let cached = resolver.import_local(name, path)?;
    tracing::info!("imported {} from {}", name, path.display());
    println!("{}", cached.display());
    Ok(())
}
