//! Response of one attempt, as seen by a completion handler.
//!
//! A [`TransportResult`] borrows the attempt's live response stream, so it cannot
//! outlive the handler call it was passed to. Both drain operations consume it,
//! which makes "drain exactly once" a property of the type.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

/// Charset assumed when the response does not advertise one.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Status line and the headers needed to deliver the body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponseHead {
    pub status: u32,
    /// Reason phrase; empty when the server sent none (e.g. HTTP/2).
    pub reason: String,
    /// `Content-Length`, if present and parsable.
    pub content_length: Option<u64>,
    /// Raw `Content-Type` value, if present.
    pub content_type: Option<String>,
}

impl ResponseHead {
    /// Whether a final response with this status carries a body.
    pub fn has_body(&self) -> bool {
        self.status >= 200 && !matches!(self.status, 204 | 205 | 304)
    }

    /// Success: 2xx with a body.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.has_body()
    }

    /// Charset parameter of `Content-Type`, else UTF-8.
    pub fn content_charset(&self) -> String {
        self.content_type
            .as_deref()
            .and_then(parse_charset)
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
    }
}

fn parse_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Handle to one response, valid only during the completion handler call.
pub struct TransportResult<'a> {
    head: ResponseHead,
    body: Box<dyn Read + 'a>,
}

impl<'a> TransportResult<'a> {
    /// Wrap a response head and its body stream. Used by transports and by test doubles.
    pub fn new(head: ResponseHead, body: impl Read + 'a) -> Self {
        Self {
            head,
            body: Box::new(body),
        }
    }

    pub fn status_code(&self) -> u32 {
        self.head.status
    }

    pub fn reason(&self) -> &str {
        &self.head.reason
    }

    pub fn content_length(&self) -> Option<u64> {
        self.head.content_length
    }

    pub fn content_charset(&self) -> String {
        self.head.content_charset()
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    /// Stream the whole body into `target`, creating or replacing it. Returns bytes copied.
    pub fn copy_to_path(self, target: &Path) -> io::Result<u64> {
        let file = File::create(target)?;
        let mut out = BufWriter::new(file);
        let n = self.copy_to(&mut out)?;
        out.flush()?;
        Ok(n)
    }

    /// Stream the whole body into `sink`. Returns bytes copied.
    ///
    /// Fails with `UnexpectedEof` when the server announced a `Content-Length`
    /// and fewer (or more) bytes arrived.
    pub fn copy_to<W: Write + ?Sized>(mut self, sink: &mut W) -> io::Result<u64> {
        let received = io::copy(&mut self.body, sink)?;
        if let Some(expected) = self.head.content_length {
            if received != expected {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("partial transfer: expected {} bytes, got {}", expected, received),
                ));
            }
        }
        Ok(received)
    }
}

impl std::fmt::Debug for TransportResult<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResult")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(status: u32, content_length: Option<u64>, content_type: Option<&str>) -> ResponseHead {
        ResponseHead {
            status,
            reason: "OK".to_string(),
            content_length,
            content_type: content_type.map(str::to_string),
        }
    }

    #[test]
    fn success_requires_2xx_and_body() {
        assert!(head(200, Some(2), None).is_success());
        assert!(head(299, None, None).is_success());
        assert!(head(200, Some(0), None).is_success());
        assert!(!head(204, None, None).is_success());
        assert!(!head(205, None, None).is_success());
        assert!(!head(304, None, None).is_success());
        assert!(!head(302, None, None).is_success());
        assert!(!head(503, Some(10), None).is_success());
        assert!(!head(404, None, None).is_success());
    }

    #[test]
    fn charset_defaults_to_utf8() {
        assert_eq!(head(200, None, None).content_charset(), "UTF-8");
        assert_eq!(head(200, None, Some("text/plain")).content_charset(), "UTF-8");
        assert_eq!(
            head(200, None, Some("text/plain; charset=ISO-8859-1")).content_charset(),
            "ISO-8859-1"
        );
        assert_eq!(
            head(200, None, Some("text/html;Charset=\"utf-16\"")).content_charset(),
            "utf-16"
        );
    }

    #[test]
    fn copy_to_sink_streams_body() {
        let r = TransportResult::new(head(200, Some(2), None), &b"OK"[..]);
        assert_eq!(r.status_code(), 200);
        assert_eq!(r.content_length(), Some(2));
        let mut sink = Vec::new();
        assert_eq!(r.copy_to(&mut sink).unwrap(), 2);
        assert_eq!(sink, b"OK");
    }

    #[test]
    fn copy_to_path_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        std::fs::write(&target, b"previous content that is longer").unwrap();
        let r = TransportResult::new(head(200, None, None), &b"signed"[..]);
        assert_eq!(r.copy_to_path(&target).unwrap(), 6);
        assert_eq!(std::fs::read(&target).unwrap(), b"signed");
    }

    #[test]
    fn short_body_is_a_partial_transfer() {
        let r = TransportResult::new(head(200, Some(10), None), &b"short"[..]);
        let err = r.copy_to(&mut io::sink()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(err.to_string().contains("expected 10 bytes, got 5"));
    }
}
