//! `rescache locate` – resolve a file id (resource name, URL or local path).

use anyhow::Result;
use rescache_core::descriptor::ResourceType;
use rescache_core::ResourceResolver;

pub fn run_locate(resolver: &ResourceResolver, file_id: &str, resource_type: &str) -> Result<()> {
    let path = resolver.locate(file_id, &ResourceType::from(resource_type))?;
    println!("{}", path.display());
    Ok(())
}
