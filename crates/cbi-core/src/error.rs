//! Failure taxonomy for one attempt (or one retried call).
//!
//! Remote rejections are not errors: they reach `CompletionHandler::on_error`
//! and make `send` return `Ok(false)`. Interruption is not an error either.

use std::time::Duration;

/// Error raised by `Transport::send` and by the request/retry builders.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Build-time validation failure (empty name, missing file, bad URI, negative retry setting).
    #[error("invalid argument: {0}")]
    Invalid(String),
    /// Curl reported an error (connection refused, reset, TLS, DNS, ...).
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("curl multi: {0}")]
    Multi(#[from] curl::MultiError),
    #[error("multipart form: {0}")]
    Form(#[from] curl::FormError),
    /// Local or body-draining I/O failure, including errors returned by a completion handler.
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),
    /// The transfer finished without a final response header block.
    #[error("server closed the connection without a response")]
    NoResponse,
    /// The attempt deadline elapsed before the exchange completed.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// The exchange was torn down by its owner (deadline or interrupt).
    #[error("attempt aborted")]
    Aborted,
    /// The attempt worker panicked.
    #[error("attempt worker failed: {0}")]
    Worker(String),
}

impl TransportError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TransportError::Invalid(msg.into())
    }

    /// Classification of this failure; see [`crate::retry::classify`].
    pub fn kind(&self) -> FailureKind {
        crate::retry::classify(self)
    }

    /// True when a retry layer may re-attempt after this failure.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

/// High-level classification of a [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Validation failure; never retried.
    Invalid,
    /// Network-level failure (refused, reset, DNS, TLS, no response).
    Connection,
    /// Deadline exceeded before a response was obtained.
    Timeout,
    /// Local or body I/O failure.
    Io,
    /// Anything else (worker panic, form construction, ...). Wrapped, still retried.
    Other,
}

impl FailureKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureKind::Invalid)
    }
}
