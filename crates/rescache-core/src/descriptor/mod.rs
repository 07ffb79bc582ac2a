//! Resource descriptors: where a named resource comes from and which digest it must match.
//!
//! The resolver only depends on the `DescriptorSource` trait and never caches
//! what it returns; every resolve sees the current descriptor.

mod source;

pub use source::{DirDescriptorSource, MemoryDescriptorSource};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::error::ResolveError;

/// Schemes fetched over the network; everything else is a local path.
const NETWORK_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

/// Trait implemented by descriptor lookups (side-car JSON directory, in-memory map, ...).
pub trait DescriptorSource: Send + Sync {
    /// Look up the descriptor for `name`; `ResolveError::NotFound` if none is registered.
    fn get(&self, name: &str) -> Result<ResourceDescriptor, ResolveError>;
}

impl<T: DescriptorSource + ?Sized> DescriptorSource for std::sync::Arc<T> {
    fn get(&self, name: &str) -> Result<ResourceDescriptor, ResolveError> {
        (**self).get(name)
    }
}

/// Kind of resource, selects the transform applied around the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    /// Stored exactly as downloaded.
    #[default]
    Plain,
    /// Compressed archive unpacked before commit.
    Archive,
    /// Custom processor registered by name (e.g. `Glove300d`).
    Other(String),
}

impl ResourceType {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceType::Plain => "Plain",
            ResourceType::Archive => "Archive",
            ResourceType::Other(name) => name,
        }
    }
}

impl From<String> for ResourceType {
    fn from(s: String) -> Self {
        ResourceType::from(s.as_str())
    }
}

impl From<&str> for ResourceType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "" | "Plain" | "plain" | "Default" | "default" => ResourceType::Plain,
            "Archive" | "archive" => ResourceType::Archive,
            other => ResourceType::Other(other.to_string()),
        }
    }
}

impl From<ResourceType> for String {
    fn from(t: ResourceType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the bytes of a resource come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Url(Url),
    Local(PathBuf),
}

impl SourceLocation {
    /// Parse a `link_or_path` string. `file://` URLs become local paths.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Ok(url) = Url::parse(s) {
            if NETWORK_SCHEMES.contains(&url.scheme()) {
                return SourceLocation::Url(url);
            }
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return SourceLocation::Local(path);
                }
            }
        }
        SourceLocation::Local(PathBuf::from(s))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, SourceLocation::Url(_))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Url(u) => f.write_str(u.as_str()),
            SourceLocation::Local(p) => write!(f, "{}", p.display()),
        }
    }
}

/// On-disk shape of a descriptor side-car (`<name>.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptorRecord {
    #[serde(alias = "link_or_path")]
    pub link: String,
    #[serde(rename = "type", default)]
    pub resource_type: ResourceType,
    pub hashtag: String,
}

/// Validated descriptor handed to the resolver. Immutable, loaded per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub location: SourceLocation,
    pub resource_type: ResourceType,
    pub expected_digest: String,
}

impl ResourceDescriptor {
    pub fn new(
        location: SourceLocation,
        resource_type: ResourceType,
        expected_digest: impl Into<String>,
    ) -> Self {
        Self {
            location,
            resource_type,
            expected_digest: expected_digest.into(),
        }
    }

    /// Validate a record read for `name`.
    pub fn from_record(name: &str, record: DescriptorRecord) -> Result<Self, ResolveError> {
        if record.link.trim().is_empty() {
            return Err(ResolveError::InvalidDescriptor {
                name: name.to_string(),
                reason: "empty link".to_string(),
            });
        }
        let digest = record.hashtag.trim();
        if digest.is_empty() {
            return Err(ResolveError::InvalidDescriptor {
                name: name.to_string(),
                reason: "empty hashtag".to_string(),
            });
        }
        Ok(Self {
            location: SourceLocation::parse(&record.link),
            resource_type: record.resource_type,
            expected_digest: digest.to_ascii_lowercase(),
        })
    }
}
