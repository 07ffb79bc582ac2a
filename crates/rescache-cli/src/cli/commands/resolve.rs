//! `rescache resolve` – print the verified local path of a named resource.

use anyhow::Result;
use rescache_core::ResourceResolver;

pub fn run_resolve(resolver: &ResourceResolver, name: &str) -> Result<()> {
    let path = resolver.resolve(name)?;
    println!("{}", path.display());
    Ok(())
}
