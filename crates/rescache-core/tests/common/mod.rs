#![allow(dead_code)]

pub mod http_server;

use std::fs;
use std::path::{Path, PathBuf};

use rescache_core::config::ResolverConfig;
use rescache_core::fetch::FetchOptions;
use rescache_core::ResourceResolver;

/// sha256("coai")
pub const COAI_SHA256: &str = "146ce545f2ed0a8767aadae8f2921f7951df817b39b8f7d0db48bce87e3eaf69";

/// Scratch cache + descriptor directories for one test.
pub struct Workspace {
    pub dir: tempfile::TempDir,
    pub cache_dir: PathBuf,
    pub descriptor_dir: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let descriptor_dir = dir.path().join("resources");
        fs::create_dir_all(&descriptor_dir).unwrap();
        Self {
            dir,
            cache_dir,
            descriptor_dir,
        }
    }

    /// Write `<descriptor_dir>/<name>.json`.
    pub fn describe(&self, name: &str, link: &str, resource_type: &str, hashtag: &str) {
        let json = serde_json::json!({
            "link": link,
            "type": resource_type,
            "hashtag": hashtag,
        });
        fs::write(
            self.descriptor_dir.join(format!("{name}.json")),
            serde_json::to_string_pretty(&json).unwrap(),
        )
        .unwrap();
    }

    pub fn config(&self) -> ResolverConfig {
        ResolverConfig::new(&self.cache_dir, &self.descriptor_dir)
    }

    pub fn resolver(&self) -> ResourceResolver {
        ResourceResolver::from_config(&self.config(), FetchOptions::default()).unwrap()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Entries left in the private staging area.
    pub fn staging_entries(&self) -> usize {
        match fs::read_dir(self.cache_dir.join(".staging")) {
            Ok(rd) => rd.count(),
            Err(_) => 0,
        }
    }
}
