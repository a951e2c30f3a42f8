//! Completion handler that saves error bodies and logs a bounded preview.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use encoding_rs::{CoderResult, Encoding, UTF_8};

use crate::error::TransportError;
use crate::result::TransportResult;

use super::CompletionHandler;

/// Lines of the error body quoted in the log.
pub const DEFAULT_PREVIEW_LINES: usize = 25;

/// Delegates successes to a caller action; on error persists the whole body to a
/// uniquely named file under `error_log_dir` and logs a preview plus its location.
///
/// `on_error` never fails: problems while saving or reading back the body are
/// logged at debug and the warning falls back to status and reason only.
pub struct ErrorReportingHandler<F> {
    error_log_dir: PathBuf,
    prefix: String,
    suffix: String,
    preview_lines: usize,
    on_success: F,
}

impl<F> ErrorReportingHandler<F>
where
    F: Fn(TransportResult<'_>) -> io::Result<bool> + Send + Sync,
{
    /// `error_log_dir` must be an existing directory.
    pub fn new(
        error_log_dir: impl Into<PathBuf>,
        prefix: &str,
        suffix: &str,
        on_success: F,
    ) -> Result<Self, TransportError> {
        let error_log_dir = error_log_dir.into();
        if !error_log_dir.is_dir() {
            return Err(TransportError::invalid(format!(
                "error log folder '{}' must be an existing directory",
                error_log_dir.display()
            )));
        }
        Ok(Self {
            error_log_dir,
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
            preview_lines: DEFAULT_PREVIEW_LINES,
            on_success,
        })
    }

    pub fn preview_lines(mut self, lines: usize) -> Self {
        self.preview_lines = lines;
        self
    }

    pub fn error_log_dir(&self) -> &Path {
        &self.error_log_dir
    }

    fn save_error_body(&self, result: TransportResult<'_>) -> io::Result<PathBuf> {
        let (mut file, path) = tempfile::Builder::new()
            .prefix(&format!("{}-", self.prefix))
            .suffix(&format!("-{}.log", self.suffix))
            .tempfile_in(&self.error_log_dir)?
            .keep()
            .map_err(|e| e.error)?;
        result.copy_to(&mut file)?;
        file.sync_all()?;
        Ok(path)
    }

    /// First `preview_lines` lines of the saved body, decoded with `encoding`.
    fn preview(&self, path: &Path, encoding: &'static Encoding) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut decoder = encoding.new_decoder_without_bom_handling();
        let mut text = String::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = file.read(&mut chunk)?;
            let last = n == 0;
            let mut input = &chunk[..n];
            loop {
                let needed = decoder
                    .max_utf8_buffer_length(input.len())
                    .unwrap_or(input.len() * 3 + 16);
                text.reserve(needed);
                let (result, read, _) = decoder.decode_to_string(input, &mut text, last);
                input = &input[read..];
                if let CoderResult::InputEmpty = result {
                    break;
                }
            }
            if last || text.matches('\n').count() > self.preview_lines {
                break;
            }
        }

        let mut all = text.lines();
        let lines: Vec<&str> = all.by_ref().take(self.preview_lines).map(str::trim_end).collect();
        let truncated = all.next().is_some();
        let mut out = lines.join("\n");
        out.push('\n');
        if truncated {
            out.push_str(&format!(
                "...<truncated output>... For complete output, see '{}'",
                path.display()
            ));
        } else {
            out.push_str(&format!(
                "Server response has been saved to '{}'",
                path.display()
            ));
        }
        Ok(out)
    }
}

impl<F> CompletionHandler for ErrorReportingHandler<F>
where
    F: Fn(TransportResult<'_>) -> io::Result<bool> + Send + Sync,
{
    fn on_success(&self, result: TransportResult<'_>) -> io::Result<bool> {
        (self.on_success)(result)
    }

    fn on_error(&self, result: TransportResult<'_>) -> io::Result<()> {
        let status = result.status_code();
        let reason = result.reason().to_string();
        let charset = result.content_charset();
        let encoding = Encoding::for_label(charset.as_bytes()).unwrap_or(UTF_8);

        let details = self
            .save_error_body(result)
            .and_then(|path| self.preview(&path, encoding));
        match details {
            Ok(preview) => {
                tracing::warn!(
                    charset = %charset,
                    "HTTP request failed. HTTP Error {} (reason: {})\n{}",
                    status,
                    reason,
                    preview
                );
            }
            Err(e) => {
                tracing::debug!(error = %e, "could not read the server response");
                tracing::warn!(
                    "HTTP request failed. HTTP Error {} (reason: {})",
                    status,
                    reason
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResponseHead;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn head(status: u32) -> ResponseHead {
        ResponseHead {
            status,
            reason: "Service Unavailable".to_string(),
            content_length: None,
            content_type: Some("text/plain".to_string()),
        }
    }

    fn saved_logs(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let res = ErrorReportingHandler::new(&missing, "sign", "jar", |_| Ok(true));
        assert!(matches!(res, Err(TransportError::Invalid(_))));
    }

    #[test]
    fn success_is_delegated() {
        let dir = tempfile::tempdir().unwrap();
        let calls = AtomicUsize::new(0);
        let handler = ErrorReportingHandler::new(dir.path(), "sign", "jar", |r| {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut sink = Vec::new();
            r.copy_to(&mut sink)?;
            Ok(sink == b"OK")
        })
        .unwrap();
        let ok = handler
            .on_success(TransportResult::new(head(200), &b"OK"[..]))
            .unwrap();
        assert!(ok);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(saved_logs(dir.path()).is_empty());
    }

    #[test]
    fn error_body_is_saved_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ErrorReportingHandler::new(dir.path(), "sign", "jar", |_| Ok(true))
            .unwrap()
            .preview_lines(2);
        let body: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        handler
            .on_error(TransportResult::new(head(503), body.as_bytes()))
            .unwrap();

        let logs = saved_logs(dir.path());
        assert_eq!(logs.len(), 1);
        let name = logs[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("sign-"), "{}", name);
        assert!(name.ends_with("-jar.log"), "{}", name);
        assert_eq!(std::fs::read_to_string(&logs[0]).unwrap(), body);
    }

    #[test]
    fn preview_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ErrorReportingHandler::new(dir.path(), "p", "s", |_| Ok(true))
            .unwrap()
            .preview_lines(3);
        let path = dir.path().join("body.log");
        std::fs::write(&path, "a\nb\nc\nd\ne\n").unwrap();
        let preview = handler.preview(&path, UTF_8).unwrap();
        let lines: Vec<&str> = preview.lines().collect();
        assert_eq!(&lines[..3], ["a", "b", "c"]);
        assert!(lines[3].starts_with("...<truncated output>..."));
        assert_eq!(lines.len(), 4);

        std::fs::write(&path, "a\nb\n").unwrap();
        let preview = handler.preview(&path, UTF_8).unwrap();
        assert!(preview.contains("has been saved to"));
    }

    #[test]
    fn preview_uses_response_charset() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ErrorReportingHandler::new(dir.path(), "p", "s", |_| Ok(true)).unwrap();
        let path = dir.path().join("body.log");
        std::fs::write(&path, b"caf\xe9 ferm\xe9\n").unwrap();

        let latin1 = Encoding::for_label(b"ISO-8859-1").unwrap();
        let preview = handler.preview(&path, latin1).unwrap();
        assert!(preview.starts_with("café fermé\n"), "{}", preview);

        let as_utf8 = handler.preview(&path, UTF_8).unwrap();
        assert!(as_utf8.starts_with("caf\u{fffd} ferm\u{fffd}\n"), "{}", as_utf8);
    }

    #[test]
    fn utf16_preview_splits_on_decoded_lines() {
        let dir = tempfile::tempdir().unwrap();
        let handler = ErrorReportingHandler::new(dir.path(), "p", "s", |_| Ok(true))
            .unwrap()
            .preview_lines(1);
        let path = dir.path().join("body.log");
        let bytes: Vec<u8> = "x\ny\n".encode_utf16().flat_map(u16::to_le_bytes).collect();
        std::fs::write(&path, bytes).unwrap();

        let utf16 = Encoding::for_label(b"utf-16le").unwrap();
        let preview = handler.preview(&path, utf16).unwrap();
        assert!(preview.starts_with("x\n...<truncated output>..."), "{}", preview);
    }

    #[test]
    fn failing_body_does_not_propagate() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let handler = ErrorReportingHandler::new(dir.path(), "p", "s", |_| Ok(true)).unwrap();
        assert!(handler
            .on_error(TransportResult::new(head(500), Broken))
            .is_ok());
    }
}
