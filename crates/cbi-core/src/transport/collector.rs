//! Easy2 Handler for one attempt: collects the final header block and buffers
//! body bytes until the completion handler pulls them.

use std::collections::VecDeque;
use std::str;

use curl::easy::{Handler, WriteError};

use crate::control::AbortToken;

use super::parse::parse_status_line;

/// Above this many buffered body bytes curl writes are paused.
pub(super) const HIGH_WATER: usize = 256 * 1024;
/// Paused writes resume once the buffer drains below this.
pub(super) const LOW_WATER: usize = 64 * 1024;

pub(super) struct Collector {
    pub(super) response_headers: Vec<String>,
    /// True once the blank line ending a final (non-1xx) header block was seen.
    pub(super) headers_done: bool,
    pub(super) body: VecDeque<u8>,
    pub(super) paused: bool,
    abort: AbortToken,
}

impl Collector {
    pub(super) fn new(abort: AbortToken) -> Self {
        Self {
            response_headers: Vec::new(),
            headers_done: false,
            body: VecDeque::new(),
            paused: false,
            abort,
        }
    }

    /// Move up to `buf.len()` buffered bytes into `buf`.
    pub(super) fn take(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.body.len());
        for (dst, src) in buf.iter_mut().zip(self.body.drain(..n)) {
            *dst = src;
        }
        n
    }

    fn final_status(&self) -> Option<u32> {
        self.response_headers
            .first()
            .and_then(|l| parse_status_line(l))
            .map(|(code, _)| code)
    }
}

impl Handler for Collector {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                self.response_headers.clear();
                self.headers_done = false;
                self.response_headers.push(line.to_string());
            } else if line.is_empty() {
                // 1xx interim responses are followed by another status line.
                if self.final_status().map_or(false, |code| code >= 200) {
                    self.headers_done = true;
                }
            } else {
                self.response_headers.push(line.to_string());
            }
        }
        !self.abort.is_aborted()
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.abort.is_aborted() {
            return Ok(0);
        }
        if self.body.len() >= HIGH_WATER {
            self.paused = true;
            return Err(WriteError::Pause);
        }
        self.body.extend(data);
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interim_response_is_discarded() {
        let mut c = Collector::new(AbortToken::new());
        c.header(b"HTTP/1.1 100 Continue\r\n");
        c.header(b"\r\n");
        assert!(!c.headers_done);
        c.header(b"HTTP/1.1 200 OK\r\n");
        c.header(b"Content-Length: 2\r\n");
        assert!(!c.headers_done);
        c.header(b"\r\n");
        assert!(c.headers_done);
        assert_eq!(c.response_headers.len(), 2);
        assert!(c.response_headers[0].contains("200"));
    }

    #[test]
    fn body_is_buffered_and_taken_in_order() {
        let mut c = Collector::new(AbortToken::new());
        assert_eq!(c.write(b"hello ").unwrap(), 6);
        assert_eq!(c.write(b"world").unwrap(), 5);
        let mut buf = [0u8; 8];
        assert_eq!(c.take(&mut buf), 8);
        assert_eq!(&buf, b"hello wo");
        assert_eq!(c.take(&mut buf), 3);
        assert_eq!(&buf[..3], b"rld");
        assert_eq!(c.take(&mut buf), 0);
    }

    #[test]
    fn write_pauses_at_high_water() {
        let mut c = Collector::new(AbortToken::new());
        let chunk = vec![0u8; HIGH_WATER];
        assert_eq!(c.write(&chunk).unwrap(), HIGH_WATER);
        assert!(matches!(c.write(b"more"), Err(WriteError::Pause)));
        assert!(c.paused);
        assert_eq!(c.body.len(), HIGH_WATER);
    }

    #[test]
    fn aborted_collector_stops_the_transfer() {
        let abort = AbortToken::new();
        let mut c = Collector::new(abort.clone());
        abort.abort();
        assert!(!c.header(b"HTTP/1.1 200 OK\r\n"));
        assert_eq!(c.write(b"data").unwrap(), 0);
    }
}
