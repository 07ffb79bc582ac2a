//! On-disk cache store and artifact lifecycle.
//!
//! Layout under the cache root:
//!
//! - `<key>`: the committed artifact (file or directory)
//! - `<key>.json`: metadata side-car, the authoritative cache-hit signal
//! - `.staging/`: private per-fetch temp directories (same filesystem as the
//!   artifacts, so commit is a rename)
//! - `.locks/<key>.lock`: advisory locks, exclusive for commit and shared
//!   while a hit is verified
//!
//! Commit order: drop the old side-car, move any old artifact aside, rename
//! the staged artifact into place, fsync, then write the side-car. A reader
//! that sees `<key>.json` therefore always finds a complete, verified artifact
//! behind it; a crash anywhere before the side-car write leaves a miss.

mod lock;
mod metadata;
mod writer;

pub use metadata::CacheMetadata;
pub use writer::StorageWriter;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{IoContext, ResolveError};
use crate::key::CacheKey;
use lock::KeyLock;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

const METADATA_EXT: &str = "json";
const STAGING_DIR: &str = ".staging";
const LOCKS_DIR: &str = ".locks";
/// Name an existing artifact is moved to (inside the staging dir) while being replaced.
const REPLACED_NAME: &str = ".replaced";

/// Path for the temp file: appends `.part` to the final path (e.g. `coai` → `coai.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Owner of a single cache root directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Open (creating if needed) the cache rooted at `root`. Relative roots are
    /// anchored at the current directory so recorded paths stay valid.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ResolveError> {
        let mut root = root.into();
        if root.is_relative() {
            let cwd = std::env::current_dir().io_context(|| "read current directory".into())?;
            root = cwd.join(root);
        }
        for dir in [root.clone(), root.join(STAGING_DIR), root.join(LOCKS_DIR)] {
            fs::create_dir_all(&dir)
                .io_context(|| format!("create cache directory {}", dir.display()))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final location of the artifact for `key`.
    pub fn artifact_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Location of the metadata side-car for `key`.
    pub fn metadata_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.{}", key.as_str(), METADATA_EXT))
    }

    /// True iff the metadata side-car is present. Artifact presence alone is not a hit.
    pub fn exists(&self, key: &CacheKey) -> bool {
        self.metadata_path(key).is_file()
    }

    /// Read the side-car for `key`; `CorruptCache` if it does not parse.
    pub fn read_metadata(&self, key: &CacheKey) -> Result<CacheMetadata, ResolveError> {
        metadata::read(&self.metadata_path(key))
    }

    /// Hold off commits of `key` while a hit is read and verified.
    pub(crate) fn read_guard(&self, key: &CacheKey) -> Result<KeyLock, ResolveError> {
        let lock_path = self.lock_path(key);
        KeyLock::acquire_shared(&lock_path).io_context(|| format!("lock {}", lock_path.display()))
    }

    /// Exclusive per-key lock taken for the whole of a commit.
    pub(crate) fn commit_guard(&self, key: &CacheKey) -> Result<KeyLock, ResolveError> {
        let lock_path = self.lock_path(key);
        KeyLock::acquire(&lock_path).io_context(|| format!("lock {}", lock_path.display()))
    }

    fn lock_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(LOCKS_DIR).join(format!("{key}.lock"))
    }

    /// Create a private staging directory for a new artifact of `key`.
    /// Everything inside is deleted when the returned `Staging` is dropped.
    pub fn stage(&self, key: &CacheKey) -> Result<Staging, ResolveError> {
        let parent = self.root.join(STAGING_DIR);
        fs::create_dir_all(&parent)
            .io_context(|| format!("create staging directory {}", parent.display()))?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}.", key.as_str()))
            .tempdir_in(&parent)
            .io_context(|| format!("create staging directory in {}", parent.display()))?;
        tracing::debug!(key = %key, staging = %dir.path().display(), "staging created");
        Ok(Staging {
            dir,
            key: key.clone(),
        })
    }

    /// Make `artifact` (a path inside `staging`) the authoritative copy for `key`.
    ///
    /// Serialized per key with an advisory lock; the side-car is written last.
    /// When two committers race, both produce a complete artifact and the last
    /// one to take the lock wins.
    pub fn commit(
        &self,
        staging: Staging,
        artifact: &Path,
        digest: Option<String>,
    ) -> Result<CacheMetadata, ResolveError> {
        let key = staging.key.clone();
        if !artifact.starts_with(staging.path()) || artifact == staging.path() {
            return Err(ResolveError::Io {
                context: format!("commit {key}"),
                source: io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "{} is not inside staging directory {}",
                        artifact.display(),
                        staging.path().display()
                    ),
                ),
            });
        }

        sync_tree(artifact).io_context(|| format!("sync staged artifact {}", artifact.display()))?;

        let _lock = self.commit_guard(&key)?;

        let meta_path = self.metadata_path(&key);
        let final_path = self.artifact_path(&key);

        match fs::remove_file(&meta_path) {
            Ok(()) => tracing::debug!(key = %key, "replacing existing cache entry"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ResolveError::Io {
                    context: format!("remove metadata {}", meta_path.display()),
                    source: e,
                })
            }
        }

        if fs::symlink_metadata(&final_path).is_ok() {
            // Leftover from a crash or a replaced entry; it goes away with the staging dir.
            let aside = staging.path().join(REPLACED_NAME);
            fs::rename(&final_path, &aside)
                .io_context(|| format!("move aside {}", final_path.display()))?;
        }

        fs::rename(artifact, &final_path).io_context(|| {
            format!(
                "move {} into cache at {}",
                artifact.display(),
                final_path.display()
            )
        })?;
        sync_dir(&self.root).io_context(|| format!("sync {}", self.root.display()))?;

        let meta = CacheMetadata {
            local_path: final_path,
            digest,
        };
        tracing::info!(key = %key, metadata = %meta_path.display(), "creating metadata file");
        metadata::write(&meta_path, &meta)
            .io_context(|| format!("write metadata {}", meta_path.display()))?;
        Ok(meta)
    }
}

/// Private staging area for one fetch/import. Removed on drop.
#[derive(Debug)]
pub struct Staging {
    dir: TempDir,
    key: CacheKey,
}

impl Staging {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Where a fetch should place its payload inside the staging directory.
    pub fn payload_path(&self) -> PathBuf {
        self.dir.path().join(self.key.as_str())
    }
}

/// fsync a file, or every file and directory of a tree.
fn sync_tree(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_file() {
        return File::open(path)?.sync_all();
    }
    if !meta.is_dir() {
        return Ok(());
    }
    for entry in walkdir::WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        let ft = entry.file_type();
        if ft.is_file() {
            File::open(entry.path())?.sync_all()?;
        } else if ft.is_dir() {
            sync_dir(entry.path())?;
        }
    }
    Ok(())
}

/// fsync a directory so renames inside it are durable. No-op off Unix.
pub(crate) fn sync_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        File::open(path)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SourceLocation;
    use crate::key::{KeyStrategy, NameKeys};

    fn key(name: &str) -> CacheKey {
        NameKeys.key_for(name, &SourceLocation::parse("http://example.org/x"))
    }

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("coai"));
        assert_eq!(p.to_string_lossy(), "coai.part");
        let p2 = temp_path(Path::new("/tmp/cache/glove.json"));
        assert_eq!(p2.to_string_lossy(), "/tmp/cache/glove.json.part");
    }

    #[test]
    fn layout_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let k = key("coai");
        assert_eq!(store.artifact_path(&k), dir.path().join("coai"));
        assert_eq!(store.metadata_path(&k), dir.path().join("coai.json"));
        assert!(dir.path().join(STAGING_DIR).is_dir());
        assert!(dir.path().join(LOCKS_DIR).is_dir());
        assert!(!store.exists(&k));
    }

    #[test]
    fn commit_file_writes_artifact_then_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let k = key("coai");

        let staging = store.stage(&k).unwrap();
        let staging_dir = staging.path().to_path_buf();
        let payload = staging.payload_path();
        fs::write(&payload, b"coai").unwrap();

        let meta = store.commit(staging, &payload, None).unwrap();
        assert_eq!(meta.local_path, store.artifact_path(&k));
        assert!(store.exists(&k));
        assert_eq!(store.read_metadata(&k).unwrap(), meta);
        assert_eq!(fs::read(store.artifact_path(&k)).unwrap(), b"coai");
        assert!(!staging_dir.exists(), "staging dir must be cleaned up");
    }

    #[test]
    fn commit_directory_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let k = key("corpus");
        let staging = store.stage(&k).unwrap();
        let tree = staging.path().join("unpacked").join("corpus");
        fs::create_dir_all(tree.join("sub")).unwrap();
        fs::write(tree.join("sub/a.txt"), b"a").unwrap();

        let meta = store.commit(staging, &tree, None).unwrap();
        assert!(meta.local_path.is_dir());
        assert_eq!(fs::read(meta.local_path.join("sub/a.txt")).unwrap(), b"a");
    }

    #[test]
    fn commit_replaces_leftover_artifact_without_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let k = key("coai");
        fs::write(store.artifact_path(&k), b"half-writ").unwrap();
        assert!(!store.exists(&k));

        let staging = store.stage(&k).unwrap();
        let payload = staging.payload_path();
        fs::write(&payload, b"coai").unwrap();
        store.commit(staging, &payload, None).unwrap();
        assert_eq!(fs::read(store.artifact_path(&k)).unwrap(), b"coai");
    }

    #[test]
    fn commit_replaces_existing_directory_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let k = key("d");
        for content in [&b"first"[..], &b"second"[..]] {
            let staging = store.stage(&k).unwrap();
            let tree = staging.payload_path();
            fs::create_dir_all(&tree).unwrap();
            fs::write(tree.join("f"), content).unwrap();
            store.commit(staging, &tree, None).unwrap();
        }
        assert_eq!(fs::read(store.artifact_path(&k).join("f")).unwrap(), b"second");
    }

    #[test]
    fn commit_rejects_paths_outside_staging() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let k = key("x");
        let outside = dir.path().join("outside.bin");
        fs::write(&outside, b"x").unwrap();
        let staging = store.stage(&k).unwrap();
        assert!(store.commit(staging, &outside, None).is_err());
        assert!(!store.exists(&k));
        assert!(outside.exists());
    }

    #[test]
    fn dropped_staging_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let k = key("gone");
        let staging = store.stage(&k).unwrap();
        fs::write(staging.payload_path(), b"partial").unwrap();
        drop(staging);
        assert!(!store.exists(&k));
        assert!(!store.artifact_path(&k).exists());
        assert_eq!(fs::read_dir(dir.path().join(STAGING_DIR)).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_metadata_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let k = key("bad");
        fs::write(store.metadata_path(&k), "not json").unwrap();
        assert!(store.exists(&k));
        assert!(matches!(
            store.read_metadata(&k),
            Err(ResolveError::CorruptCache { .. })
        ));
    }
}
