//! Response header collection during a transfer.

/// Header lines of the current response. Reset on every status line so only
/// the final response after redirects is kept.
#[derive(Debug, Default)]
pub(crate) struct ResponseHeaders {
    lines: Vec<String>,
}

impl ResponseHeaders {
    /// Feed one raw header line as delivered by libcurl.
    pub(crate) fn push_line(&mut self, raw: &[u8]) {
        let line = String::from_utf8_lossy(raw).trim_end().to_string();
        if line.starts_with("HTTP/") {
            self.lines.clear();
        }
        if !line.is_empty() {
            self.lines.push(line);
        }
    }

    /// `Content-Length` of the final response, if present and numeric.
    pub(crate) fn content_length(&self) -> Option<u64> {
        self.value("content-length")
            .and_then(|v| v.parse::<u64>().ok())
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| {
            let (n, v) = line.split_once(':')?;
            if n.trim().eq_ignore_ascii_case(name) {
                Some(v.trim())
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(lines: &[&str]) -> ResponseHeaders {
        let mut h = ResponseHeaders::default();
        for l in lines {
            h.push_line(format!("{l}\r\n").as_bytes());
        }
        h
    }

    #[test]
    fn content_length_parsed() {
        let h = feed(&["HTTP/1.1 200 OK", "Content-Length: 12345", ""]);
        assert_eq!(h.content_length(), Some(12345));
    }

    #[test]
    fn content_length_missing_or_bad() {
        assert_eq!(feed(&["HTTP/1.1 200 OK"]).content_length(), None);
        assert_eq!(
            feed(&["HTTP/1.1 200 OK", "content-length: lots"]).content_length(),
            None
        );
    }

    #[test]
    fn redirect_resets_headers() {
        let h = feed(&[
            "HTTP/1.1 302 Found",
            "Content-Length: 0",
            "Location: /real",
            "",
            "HTTP/1.1 200 OK",
            "Transfer-Encoding: chunked",
            "",
        ]);
        assert_eq!(h.content_length(), None);
    }
}
