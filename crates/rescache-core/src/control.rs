//! Cancellation for long-running fetches.
//!
//! An `AbortToken` is shared between the caller and the fetch loop. The loop
//! checks it after every chunk; once set, the transfer stops, the staging
//! directory is discarded, and nothing is committed. Artifacts that were
//! already committed are never rolled back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable abort flag. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    flag: Arc<AtomicBool>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort. Idempotent.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
