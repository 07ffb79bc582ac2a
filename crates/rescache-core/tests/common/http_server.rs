//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a single static body to every GET and counts the GETs, so a test can
//! assert that a cache hit never touched the network.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Status line sent with the body (e.g. 404 to simulate a missing file).
    pub status: u16,
    /// If false, omit `Content-Length` and close the connection after the body.
    pub content_length: bool,
    /// Send only this many body bytes while still advertising the full length.
    pub truncate_to: Option<usize>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            status: 200,
            content_length: true,
            truncate_to: None,
        }
    }
}

/// Handle to a running server. The server runs until the process exits.
pub struct TestServer {
    pub url: String,
    gets: Arc<AtomicUsize>,
}

impl TestServer {
    /// Number of GET requests served so far.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

pub fn start(body: Vec<u8>) -> TestServer {
    start_with_options(body, ServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: ServerOptions) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let gets = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&gets);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &body, opts, &counter));
        }
    });
    TestServer {
        url: format!("http://127.0.0.1:{}/resource", port),
        gets,
    }
}

/// A URL on a port nobody listens on (bound, then released).
pub fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/gone", port)
}

fn handle(
    mut stream: std::net::TcpStream,
    body: &[u8],
    opts: ServerOptions,
    gets: &AtomicUsize,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let method = request.split_whitespace().next().unwrap_or("");
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\n\r\n");
        return;
    }
    gets.fetch_add(1, Ordering::SeqCst);

    let reason = match opts.status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let length = if opts.content_length {
        format!("Content-Length: {}\r\n", body.len())
    } else {
        String::new()
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\n{}Connection: close\r\n\r\n",
        opts.status, reason, length
    );
    let _ = stream.write_all(response.as_bytes());
    let sent = match opts.truncate_to {
        Some(n) => &body[..n.min(body.len())],
        None => body,
    };
    let _ = stream.write_all(sent);
    let _ = stream.flush();
}
