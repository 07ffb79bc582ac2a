//! Typed errors surfaced by `resolve` / `import_local` and friends.
//!
//! Every failure path reaches the caller as one of these variants; nothing is
//! swallowed inside the core.

use std::io;
use std::path::PathBuf;

use crate::fetch::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No descriptor is registered for the resource name.
    #[error("no descriptor registered for resource '{name}'")]
    NotFound { name: String },

    /// A descriptor exists but cannot be used (malformed JSON, empty hashtag, bad name).
    #[error("invalid descriptor for '{name}': {reason}")]
    InvalidDescriptor { name: String, reason: String },

    /// Network or stream failure while fetching. Not retried by the core.
    #[error("failed to fetch {location}")]
    Transport {
        location: String,
        #[source]
        source: FetchError,
    },

    /// Fetch was cancelled through an `AbortToken`.
    #[error("fetch of {location} aborted")]
    Aborted { location: String },

    /// Digest mismatch, either right after download or on cache-hit re-verification.
    #[error("bad hashtag of {name}: expected {expected}, found {actual}")]
    Integrity {
        name: String,
        expected: String,
        actual: String,
    },

    /// Metadata side-car exists but is unreadable, malformed, or points at nothing.
    #[error("corrupt cache entry {}: {reason}", path.display())]
    CorruptCache { path: PathBuf, reason: String },

    /// A pre/post transform hook failed.
    #[error("{stage} transform for resource type '{resource_type}' failed")]
    Transform {
        resource_type: String,
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ResolveError {
    /// True for `Integrity` errors (tampered or mismatching artifact).
    pub fn is_integrity(&self) -> bool {
        matches!(self, ResolveError::Integrity { .. })
    }
}

/// Attach a lazily built context message to an `io::Result`, like `anyhow::Context`.
pub(crate) trait IoContext<T> {
    fn io_context<F: FnOnce() -> String>(self, f: F) -> Result<T, ResolveError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<F: FnOnce() -> String>(self, f: F) -> Result<T, ResolveError> {
        self.map_err(|source| ResolveError::Io {
            context: f(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_message_names_resource_and_digests() {
        let e = ResolveError::Integrity {
            name: "demo".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(e.is_integrity());
        assert_eq!(e.to_string(), "bad hashtag of demo: expected aa, found bb");
    }

    #[test]
    fn io_context_keeps_source() {
        let r: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let e = r.io_context(|| "open /nowhere".to_string()).unwrap_err();
        assert_eq!(e.to_string(), "open /nowhere");
        let source = std::error::Error::source(&e).unwrap();
        assert_eq!(source.to_string(), "gone");
    }
}
