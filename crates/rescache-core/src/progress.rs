//! Progress reporting for fetches.
//!
//! The fetch loop reports to an injected `ProgressObserver` after every chunk;
//! the default `NoProgress` discards everything, so the core stays testable
//! without a terminal. `ProgressStats` is a CLI-friendly snapshot
//! (rate = bytes_done / elapsed_secs, ETA = remaining / rate).

/// Receives transfer progress. Implementations must be cheap; `on_bytes` runs per chunk.
pub trait ProgressObserver: Send + Sync {
    /// Transfer started; `total` is the `Content-Length` hint when known.
    fn on_start(&self, _total: Option<u64>) {}
    /// `n` more bytes were written to the staging file.
    fn on_bytes(&self, n: u64);
    /// Transfer finished (successfully or not).
    fn on_finish(&self) {}
}

/// Observer that ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_bytes(&self, _n: u64) {}
}

/// Snapshot of fetch progress for one resource.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes written so far.
    pub bytes_done: u64,
    /// Total size in bytes, if the server sent a length hint.
    pub total_bytes: Option<u64>,
    /// Elapsed time since the transfer started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if the total is unknown or rate is 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0]; None when progress is indeterminate.
    pub fn fraction(&self) -> Option<f64> {
        let total = self.total_bytes?;
        if total == 0 {
            return Some(1.0);
        }
        Some((self.bytes_done as f64 / total as f64).min(1.0))
    }
}
