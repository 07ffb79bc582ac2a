//! Fetcher: bytes from a source location into a private staging path.
//!
//! Network sources stream through libcurl in fixed-size chunks (never the
//! whole payload in memory); local sources are copied without a network
//! round trip. Either way the payload lands at `<dest>.part` first and is
//! renamed to `dest` only when complete, so a failed or aborted fetch leaves
//! nothing but a temp file inside the staging directory.

mod headers;
mod http;
mod local;

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::control::AbortToken;
use crate::descriptor::SourceLocation;
use crate::progress::{NoProgress, ProgressObserver};

/// Transfer tuning derived from `FetchConfig`.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    /// Whole-transfer timeout; None = unlimited (datasets may take hours).
    pub timeout: Option<Duration>,
    /// Abort when slower than this many bytes/sec for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub max_redirections: u32,
    /// Chunk size handed to the write callback.
    pub buffer_size: usize,
    pub max_recv_speed: Option<u64>,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: cfg.timeout_secs.map(Duration::from_secs),
            low_speed_limit: cfg.low_speed_limit,
            low_speed_time: Duration::from_secs(cfg.low_speed_time_secs),
            max_redirections: cfg.max_redirections,
            buffer_size: cfg.buffer_size,
            max_recv_speed: cfg.max_recv_speed,
            user_agent: format!("rescache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Error returned by a single fetch (curl failure, HTTP error, short body, or I/O).
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, DNS, ...).
    Curl(curl::Error),
    /// Response had a non-2xx status.
    Http(u32),
    /// Transfer ended before `Content-Length` bytes arrived.
    PartialTransfer { expected: u64, received: u64 },
    /// Writing the staging file failed (disk full, permissions).
    Storage(io::Error),
    /// Reading a local source failed.
    Local(io::Error),
    /// Stopped through an `AbortToken`.
    Aborted,
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            FetchError::Storage(e) => write!(f, "staging: {}", e),
            FetchError::Local(e) => write!(f, "local source: {}", e),
            FetchError::Aborted => write!(f, "fetch aborted"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Storage(e) | FetchError::Local(e) => Some(e),
            FetchError::Http(_) | FetchError::PartialTransfer { .. } | FetchError::Aborted => None,
        }
    }
}

/// Retrieves resources into staging, reporting to an injected observer.
#[derive(Clone)]
pub struct Fetcher {
    options: FetchOptions,
    observer: Arc<dyn ProgressObserver>,
    abort: Option<AbortToken>,
}

impl Default for Fetcher {
    fn default() -> Self {
        Fetcher::new(FetchOptions::default())
    }
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("options", &self.options)
            .field("abort", &self.abort)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self {
            options,
            observer: Arc::new(NoProgress),
            abort: None,
        }
    }

    /// Report chunk progress to `observer` instead of discarding it.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Stop transfers when `token` is aborted.
    pub fn with_abort(mut self, token: AbortToken) -> Self {
        self.abort = Some(token);
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch `location` into `dest`. Returns bytes transferred.
    pub fn fetch(&self, location: &SourceLocation, dest: &Path) -> Result<u64, FetchError> {
        match location {
            SourceLocation::Url(url) => {
                tracing::info!(url = %url, dest = %dest.display(), "downloading");
                http::fetch_url(
                    url,
                    dest,
                    &self.options,
                    self.observer.as_ref(),
                    self.abort.as_ref(),
                )
            }
            SourceLocation::Local(path) => self.copy_local(path, dest),
        }
    }

    /// Copy an already-local file or directory into `dest`.
    pub fn copy_local(&self, src: &Path, dest: &Path) -> Result<u64, FetchError> {
        tracing::info!(src = %src.display(), dest = %dest.display(), "copying local resource");
        local::copy_into(
            src,
            dest,
            self.options.buffer_size,
            self.observer.as_ref(),
            self.abort.as_ref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct Recorder {
        bytes: AtomicU64,
        total: AtomicU64,
        finished: AtomicU64,
    }

    impl ProgressObserver for Recorder {
        fn on_start(&self, total: Option<u64>) {
            self.total.store(total.unwrap_or(u64::MAX), Ordering::Relaxed);
        }
        fn on_bytes(&self, n: u64) {
            self.bytes.fetch_add(n, Ordering::Relaxed);
        }
        fn on_finish(&self) {
            self.finished.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn options_from_config() {
        let cfg = FetchConfig {
            timeout_secs: Some(10),
            ..FetchConfig::default()
        };
        let o = FetchOptions::from(&cfg);
        assert_eq!(o.timeout, Some(Duration::from_secs(10)));
        assert_eq!(o.connect_timeout, Duration::from_secs(cfg.connect_timeout_secs));
        assert!(o.user_agent.starts_with("rescache/"));
        assert!(FetchOptions::default().timeout.is_none());
    }

    #[test]
    fn copy_local_file_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let payload: Vec<u8> = (0u8..=255).cycle().take(100_000).collect();
        fs::write(&src, &payload).unwrap();

        let rec = Arc::new(Recorder::default());
        let fetcher = Fetcher::default().with_observer(rec.clone());
        let dest = dir.path().join("dest");
        let n = fetcher
            .fetch(&SourceLocation::Local(src.clone()), &dest)
            .unwrap();
        assert_eq!(n, payload.len() as u64);
        assert_eq!(fs::read(&dest).unwrap(), payload);
        assert_eq!(rec.bytes.load(Ordering::Relaxed), payload.len() as u64);
        assert_eq!(rec.total.load(Ordering::Relaxed), payload.len() as u64);
        assert_eq!(rec.finished.load(Ordering::Relaxed), 1);
        assert!(src.exists(), "source must be left untouched");
    }

    #[test]
    fn copy_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree");
        fs::create_dir_all(src.join("a/b")).unwrap();
        fs::write(src.join("a/b/x.txt"), b"xx").unwrap();
        fs::write(src.join("top.txt"), b"t").unwrap();
        fs::create_dir(src.join("empty")).unwrap();

        let dest = dir.path().join("copy");
        let n = Fetcher::default().copy_local(&src, &dest).unwrap();
        assert_eq!(n, 3);
        assert_eq!(fs::read(dest.join("a/b/x.txt")).unwrap(), b"xx");
        assert!(dest.join("empty").is_dir());
        assert_eq!(
            crate::checksum::digest_path(&src).unwrap(),
            crate::checksum::digest_path(&dest).unwrap()
        );
    }

    #[test]
    fn copy_local_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = Fetcher::default()
            .copy_local(&dir.path().join("nope"), &dir.path().join("dest"))
            .unwrap_err();
        assert!(matches!(err, FetchError::Local(_)));
        assert!(!dir.path().join("dest").exists());
    }

    #[test]
    fn aborted_copy_leaves_no_dest() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::write(&src, b"data").unwrap();
        let token = AbortToken::new();
        token.abort();
        let dest = dir.path().join("dest");
        let err = Fetcher::default()
            .with_abort(token)
            .copy_local(&src, &dest)
            .unwrap_err();
        assert!(matches!(err, FetchError::Aborted));
        assert!(!dest.exists());
    }

    #[test]
    fn fetch_error_display() {
        assert_eq!(FetchError::Http(404).to_string(), "HTTP 404");
        assert_eq!(
            FetchError::PartialTransfer {
                expected: 10,
                received: 4
            }
            .to_string(),
            "partial transfer: expected 10 bytes, got 4"
        );
    }
}
