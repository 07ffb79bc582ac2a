//! Single-stream HTTP/FTP GET into a staging file.
//!
//! Writes the response body sequentially, one libcurl chunk at a time, and
//! reports every chunk to the progress observer. The body never touches the
//! final cache path: it lands in `<dest>.part` and is renamed to `dest` only
//! after the transfer completed with the advertised length.

use std::cell::{Cell, RefCell};
use std::io;
use std::path::Path;
use url::Url;

use super::headers::ResponseHeaders;
use super::{FetchError, FetchOptions};
use crate::control::AbortToken;
use crate::progress::ProgressObserver;
use crate::storage::{temp_path, StorageWriter};

/// Downloads `url` into `dest` (via `dest.part`). Returns the number of bytes written.
pub(crate) fn fetch_url(
    url: &Url,
    dest: &Path,
    opts: &FetchOptions,
    observer: &dyn ProgressObserver,
    abort: Option<&AbortToken>,
) -> Result<u64, FetchError> {
    let part = temp_path(dest);
    let mut storage = StorageWriter::create(&part).map_err(FetchError::Storage)?;

    let headers = RefCell::new(ResponseHeaders::default());
    let started = Cell::new(false);
    let aborted = Cell::new(false);
    let write_error: RefCell<Option<io::Error>> = RefCell::new(None);
    let abort_requested = || abort.map_or(false, AbortToken::is_aborted);

    let mut easy = curl::easy::Easy::new();
    configure(&mut easy, url, opts).map_err(FetchError::Curl)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                headers.borrow_mut().push_line(data);
                true
            })
            .map_err(FetchError::Curl)?;
        transfer
            .progress_function(|_, _, _, _| {
                if abort_requested() {
                    aborted.set(true);
                    return false;
                }
                true
            })
            .map_err(FetchError::Curl)?;
        transfer
            .write_function(|data| {
                if abort_requested() {
                    aborted.set(true);
                    return Ok(0); // abort transfer
                }
                if !started.get() {
                    started.set(true);
                    observer.on_start(headers.borrow().content_length());
                }
                match storage.append(data) {
                    Ok(()) => {
                        observer.on_bytes(data.len() as u64);
                        Ok(data.len())
                    }
                    Err(e) => {
                        tracing::warn!("staging write failed: {}", e);
                        *write_error.borrow_mut() = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })
            .map_err(FetchError::Curl)?;
        transfer.perform()
    };

    if !started.get() {
        observer.on_start(headers.borrow().content_length());
    }
    observer.on_finish();

    if aborted.get() {
        return Err(FetchError::Aborted);
    }
    if let Some(e) = write_error.into_inner() {
        return Err(FetchError::Storage(e));
    }
    performed.map_err(FetchError::Curl)?;

    let code = easy.response_code().map_err(FetchError::Curl)?;
    if code != 0 && !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    let written = storage.written();
    if let Some(expected) = headers.borrow().content_length() {
        if written != expected {
            return Err(FetchError::PartialTransfer {
                expected,
                received: written,
            });
        }
    }

    storage.sync().map_err(FetchError::Storage)?;
    storage.finalize(dest).map_err(FetchError::Storage)?;
    tracing::debug!(url = %url, bytes = written, "fetch complete");
    Ok(written)
}

fn configure(
    easy: &mut curl::easy::Easy,
    url: &Url,
    opts: &FetchOptions,
) -> Result<(), curl::Error> {
    easy.url(url.as_str())?;
    easy.follow_location(true)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.fail_on_error(false)?;
    easy.progress(true)?;
    easy.useragent(&opts.user_agent)?;
    easy.buffer_size(opts.buffer_size)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    if let Some(t) = opts.timeout {
        easy.timeout(t)?;
    }
    if let Some(speed) = opts.max_recv_speed {
        easy.max_recv_speed(speed)?;
    }
    Ok(())
}
