//! CLI command handlers, one file per command.

mod checksum;
mod import;
mod locate;
mod progress;
mod resolve;
mod status;

pub use checksum::run_checksum;
pub use import::run_import;
pub use locate::run_locate;
pub use resolve::run_resolve;
pub use status::run_status;

use anyhow::{Context, Result};
use rescache_core::config::{ResolverConfig, RescacheConfig};
use rescache_core::fetch::FetchOptions;
use rescache_core::ResourceResolver;
use std::sync::Arc;

/// Resolver over the configured directories, with a stderr progress line unless `quiet`.
pub fn open_resolver(
    dirs: &ResolverConfig,
    cfg: &RescacheConfig,
    quiet: bool,
) -> Result<ResourceResolver> {
    let resolver = ResourceResolver::from_config(dirs, FetchOptions::from(&cfg.fetch))
        .with_context(|| format!("open cache at {}", dirs.cache_dir.display()))?;
    if quiet {
        return Ok(resolver);
    }
    let fetcher = resolver
        .fetcher()
        .clone()
        .with_observer(Arc::new(progress::StderrProgress::new()));
    Ok(resolver.with_fetcher(fetcher))
}
