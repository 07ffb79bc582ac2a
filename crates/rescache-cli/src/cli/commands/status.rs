//! `rescache status` – list descriptors and their cache state.

use anyhow::Result;
use rescache_core::{ResolveError, ResourceResolver};

pub fn run_status(resolver: &ResourceResolver, names: &[String]) -> Result<()> {
    let names = if names.is_empty() {
        resolver.source().names()?
    } else {
        names.to_vec()
    };
    if names.is_empty() {
        println!(
            "No resources registered in {}.",
            resolver.source().dir().display()
        );
        return Ok(());
    }

    println!("{:<24} {:<10} {}", "NAME", "STATE", "PATH");
    for name in names {
        let (state, path) = match resolver.cache_key(&name) {
            Ok(key) if resolver.store().exists(&key) => match resolver.store().read_metadata(&key) {
                Ok(meta) => ("cached", meta.local_path.display().to_string()),
                Err(_) => ("corrupt", resolver.store().metadata_path(&key).display().to_string()),
            },
            Ok(_) => ("missing", "-".to_string()),
            Err(ResolveError::NotFound { .. }) => ("unknown", "-".to_string()),
            Err(e) => {
                tracing::debug!("status of {}: {}", name, e);
                ("invalid", "-".to_string())
            }
        };
        println!("{:<24} {:<10} {}", name, state, path);
    }
    Ok(())
}
