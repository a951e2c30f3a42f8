//! Completion handlers: what to do with the response of an attempt.

mod reporting;

use std::io;

use crate::result::TransportResult;

pub use reporting::{ErrorReportingHandler, DEFAULT_PREVIEW_LINES};

/// Success/error callback pair, invoked at most once per attempt that reaches a response.
///
/// Calls happen on the attempt's worker thread while the connection is still open;
/// the handler drains the body through the [`TransportResult`] it receives.
pub trait CompletionHandler: Send + Sync {
    /// Called for a 2xx response with a body. The returned flag becomes the result of
    /// the attempt; an error fails the attempt (it is retryable).
    fn on_success(&self, result: TransportResult<'_>) -> io::Result<bool>;

    /// Called for any other response. The attempt reports `false` whether or not this
    /// succeeds; an error is only logged.
    fn on_error(&self, result: TransportResult<'_>) -> io::Result<()>;
}
