//! Cache key derivation.
//!
//! A `CacheKey` names both the artifact (`<root>/<key>`) and its metadata
//! side-car (`<root>/<key>.json`). Derivation is a pluggable `KeyStrategy`:
//! named resources use `NameKeys`, anonymous URLs use `LocationKeys`. Both are
//! pure functions of their input, so the same logical resource maps to the
//! same key in every process and on every machine.

mod sanitize;

use sha2::{Digest, Sha256};
use std::fmt;

use crate::descriptor::SourceLocation;

/// Suffixes the store uses next to artifacts; a key must never end with one.
const RESERVED_SUFFIXES: &[&str] = &[".json", ".part", ".lock"];

/// Hex chars of the name hash appended when sanitizing was lossy.
const DISAMBIGUATOR_LEN: usize = 12;

/// Stable on-disk identifier of a cached resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strategy turning a resource identity into a cache key.
pub trait KeyStrategy: Send + Sync {
    fn key_for(&self, name: &str, location: &SourceLocation) -> CacheKey;
}

/// Key = the resource name, made filesystem-safe.
///
/// Names that survive sanitizing unchanged are used verbatim (`coai` ⇒ `coai`).
/// Otherwise a short hash of the original name is appended, so two distinct
/// names can never collapse onto the same key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameKeys;

impl KeyStrategy for NameKeys {
    fn key_for(&self, name: &str, _location: &SourceLocation) -> CacheKey {
        let clean = sanitize::sanitize_component(name);
        let reserved = RESERVED_SUFFIXES.iter().any(|s| clean.ends_with(s));
        if !clean.is_empty() && clean == name && !reserved {
            return CacheKey(clean);
        }
        let hash = sha256_hex(name.as_bytes());
        let tag = &hash[..DISAMBIGUATOR_LEN];
        if clean.is_empty() {
            CacheKey(tag.to_string())
        } else {
            CacheKey(format!("{clean}-{tag}"))
        }
    }
}

/// Key = SHA-256 hex of the source-location string (anonymous URL addressing).
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationKeys;

impl KeyStrategy for LocationKeys {
    fn key_for(&self, _name: &str, location: &SourceLocation) -> CacheKey {
        CacheKey(sha256_hex(location.to_string().as_bytes()))
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
