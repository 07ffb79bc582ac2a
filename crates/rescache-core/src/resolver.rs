//! Resource resolution: descriptor lookup, cache hit verification, fetch and commit.
//!
//! Every call ends either with a verified local path or a typed
//! `ResolveError`. A hit is re-digested on every call; a miss is fetched into
//! private staging, transformed, digested, and committed only on a match.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::checksum::{digest_path, digests_match};
use crate::config::ResolverConfig;
use crate::descriptor::{DescriptorSource, DirDescriptorSource, ResourceType, SourceLocation};
use crate::error::{IoContext, ResolveError};
use crate::fetch::{FetchError, FetchOptions, Fetcher};
use crate::key::{CacheKey, KeyStrategy, LocationKeys, NameKeys};
use crate::storage::CacheStore;
use crate::transform::{Transform, TransformRegistry};

/// Prefix of file ids that name a registered resource (`resources://coai`).
pub const RESOURCE_SCHEME: &str = "resources://";

pub struct ResourceResolver<S = DirDescriptorSource> {
    source: S,
    store: CacheStore,
    fetcher: Fetcher,
    transforms: TransformRegistry,
    keys: Arc<dyn KeyStrategy>,
}

impl ResourceResolver<DirDescriptorSource> {
    /// Resolver over `<descriptor_dir>/<name>.json` side-cars and a cache at `cache_dir`.
    pub fn from_config(cfg: &ResolverConfig, options: FetchOptions) -> Result<Self, ResolveError> {
        let store = CacheStore::open(cfg.cache_dir.clone())?;
        Ok(Self::new(
            DirDescriptorSource::new(cfg.descriptor_dir.clone()),
            store,
            Fetcher::new(options),
        ))
    }
}

impl<S: DescriptorSource> ResourceResolver<S> {
    pub fn new(source: S, store: CacheStore, fetcher: Fetcher) -> Self {
        Self {
            source,
            store,
            fetcher,
            transforms: TransformRegistry::with_defaults(),
            keys: Arc::new(NameKeys),
        }
    }

    pub fn with_transforms(mut self, transforms: TransformRegistry) -> Self {
        self.transforms = transforms;
        self
    }

    /// Replace the key strategy for named resources (default `NameKeys`).
    pub fn with_key_strategy(mut self, keys: Arc<dyn KeyStrategy>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn transforms_mut(&mut self) -> &mut TransformRegistry {
        &mut self.transforms
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Cache key of a registered resource.
    pub fn cache_key(&self, name: &str) -> Result<CacheKey, ResolveError> {
        let descriptor = self.source.get(name)?;
        Ok(self.keys.key_for(name, &descriptor.location))
    }

    /// True iff `name` has a committed metadata side-car. Does not verify the digest.
    pub fn is_cached(&self, name: &str) -> Result<bool, ResolveError> {
        Ok(self.store.exists(&self.cache_key(name)?))
    }

    /// Resolve a registered resource to a verified local path, fetching it on a miss.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ResolveError> {
        let descriptor = self.source.get(name)?;
        let key = self.keys.key_for(name, &descriptor.location);
        let transform = self.transforms.get(&descriptor.resource_type);

        let committed = if self.store.exists(&key) {
            tracing::info!(name, key = %key, "cache hit");
            self.verify_hit(name, &key, Some(descriptor.expected_digest.as_str()))?
        } else {
            tracing::info!(name, key = %key, location = %descriptor.location, "cache miss");
            self.fetch_and_commit(
                name,
                &key,
                &descriptor.location,
                &descriptor.resource_type,
                transform.as_ref(),
                Some(descriptor.expected_digest.as_str()),
            )?
        };
        post(transform.as_ref(), &descriptor.resource_type, &committed)
    }

    /// Side-load an already-local file or directory as the cached copy of `name`.
    ///
    /// The source is verified against the descriptor, copied into staging and
    /// committed; the caller's copy is never moved or modified.
    pub fn import_local(&self, name: &str, path: &Path) -> Result<PathBuf, ResolveError> {
        let descriptor = self.source.get(name)?;
        let key = self.keys.key_for(name, &descriptor.location);
        let transform = self.transforms.get(&descriptor.resource_type);
        tracing::info!(name, key = %key, path = %path.display(), "importing local resource");

        let source_digest =
            digest_path(path).io_context(|| format!("digest {}", path.display()))?;
        check_digest(name, &descriptor.expected_digest, &source_digest)?;

        let staging = self.store.stage(&key)?;
        let payload = staging.payload_path();
        self.fetcher
            .copy_local(path, &payload)
            .map_err(|e| fetch_failure(&path.display().to_string(), e))?;
        // The source may have changed while it was being copied.
        let copied = digest_path(&payload).io_context(|| format!("digest {}", payload.display()))?;
        check_digest(name, &descriptor.expected_digest, &copied)?;

        let meta = self.store.commit(staging, &payload, None)?;
        tracing::info!(name, path = %meta.local_path.display(), "imported");
        post(transform.as_ref(), &descriptor.resource_type, &meta.local_path)
    }

    /// Resolve a URL with no registered descriptor.
    ///
    /// The first fetch is trusted and its digest recorded in the side-car;
    /// later hits are verified against that recorded digest.
    pub fn resolve_url(
        &self,
        url: &Url,
        resource_type: &ResourceType,
    ) -> Result<PathBuf, ResolveError> {
        let location = SourceLocation::Url(url.clone());
        let key = LocationKeys.key_for(url.as_str(), &location);
        let transform = self.transforms.get(resource_type);
        let name = url.as_str();

        let committed = if self.store.exists(&key) {
            tracing::info!(url = name, key = %key, "cache hit");
            self.verify_hit(name, &key, None)?
        } else {
            tracing::info!(url = name, key = %key, "cache miss");
            self.fetch_and_commit(
                name,
                &key,
                &location,
                resource_type,
                transform.as_ref(),
                None,
            )?
        };
        post(transform.as_ref(), resource_type, &committed)
    }

    /// Dispatch a file id: `resources://<name>`, a network URL, or a local path.
    ///
    /// Local paths are temporary resources: they bypass the cache and only go
    /// through the type's post transform.
    pub fn locate(
        &self,
        file_id: &str,
        resource_type: &ResourceType,
    ) -> Result<PathBuf, ResolveError> {
        if let Some(name) = file_id.strip_prefix(RESOURCE_SCHEME) {
            return self.resolve(name);
        }
        match SourceLocation::parse(file_id) {
            SourceLocation::Url(url) => self.resolve_url(&url, resource_type),
            SourceLocation::Local(path) => {
                fs::symlink_metadata(&path)
                    .io_context(|| format!("local resource {}", path.display()))?;
                let transform = self.transforms.get(resource_type);
                post(transform.as_ref(), resource_type, &path)
            }
        }
    }

    /// Re-digest a committed artifact under the reader lock.
    /// `expected = None` uses the digest recorded in the side-car.
    fn verify_hit(
        &self,
        name: &str,
        key: &CacheKey,
        expected: Option<&str>,
    ) -> Result<PathBuf, ResolveError> {
        let _guard = self.store.read_guard(key)?;
        let meta = self.store.read_metadata(key)?;
        let meta_path = self.store.metadata_path(key);
        match fs::symlink_metadata(&meta.local_path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ResolveError::CorruptCache {
                    path: meta_path,
                    reason: format!("artifact {} is missing", meta.local_path.display()),
                })
            }
            Err(source) => {
                return Err(ResolveError::Io {
                    context: format!("stat {}", meta.local_path.display()),
                    source,
                })
            }
        }

        let expected = match expected.or(meta.digest.as_deref()) {
            Some(d) => d.to_string(),
            None => {
                return Err(ResolveError::CorruptCache {
                    path: meta_path,
                    reason: "no digest recorded".to_string(),
                })
            }
        };
        let actual = digest_path(&meta.local_path)
            .io_context(|| format!("digest {}", meta.local_path.display()))?;
        if let Err(e) = check_digest(name, &expected, &actual) {
            tracing::warn!(
                name,
                path = %meta.local_path.display(),
                "cached artifact does not match its digest"
            );
            return Err(e);
        }
        Ok(meta.local_path)
    }

    /// Miss path: fetch into staging, run `pre`, digest, commit on match.
    /// Any failure drops the staging directory and leaves the cache untouched.
    fn fetch_and_commit(
        &self,
        name: &str,
        key: &CacheKey,
        location: &SourceLocation,
        resource_type: &ResourceType,
        transform: &dyn Transform,
        expected: Option<&str>,
    ) -> Result<PathBuf, ResolveError> {
        let staging = self.store.stage(key)?;
        let payload = staging.payload_path();
        let bytes = self
            .fetcher
            .fetch(location, &payload)
            .map_err(|e| fetch_failure(&location.to_string(), e))?;
        tracing::debug!(name, bytes, "fetched into staging");

        let artifact = transform
            .pre(&payload)
            .map_err(|source| ResolveError::Transform {
                resource_type: resource_type.to_string(),
                stage: "pre",
                source,
            })?;
        if !artifact.starts_with(staging.path()) {
            return Err(ResolveError::Transform {
                resource_type: resource_type.to_string(),
                stage: "pre",
                source: anyhow::anyhow!(
                    "returned {} outside the staging directory",
                    artifact.display()
                ),
            });
        }

        let actual =
            digest_path(&artifact).io_context(|| format!("digest {}", artifact.display()))?;
        let recorded = match expected {
            Some(expected) => {
                check_digest(name, expected, &actual)?;
                None
            }
            None => Some(actual),
        };

        let meta = self.store.commit(staging, &artifact, recorded)?;
        tracing::info!(name, path = %meta.local_path.display(), "committed to cache");
        Ok(meta.local_path)
    }
}

fn check_digest(name: &str, expected: &str, actual: &str) -> Result<(), ResolveError> {
    if digests_match(expected, actual) {
        return Ok(());
    }
    Err(ResolveError::Integrity {
        name: name.to_string(),
        expected: expected.trim().to_ascii_lowercase(),
        actual: actual.to_string(),
    })
}

fn fetch_failure(location: &str, e: FetchError) -> ResolveError {
    match e {
        FetchError::Aborted => ResolveError::Aborted {
            location: location.to_string(),
        },
        source => ResolveError::Transport {
            location: location.to_string(),
            source,
        },
    }
}

fn post(
    transform: &dyn Transform,
    resource_type: &ResourceType,
    path: &Path,
) -> Result<PathBuf, ResolveError> {
    transform
        .post(path)
        .map_err(|source| ResolveError::Transform {
            resource_type: resource_type.to_string(),
            stage: "post",
            source,
        })
}
