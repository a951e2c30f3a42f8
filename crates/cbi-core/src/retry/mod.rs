//! Bounded retry with a fixed wait between attempts.
//!
//! `classify` maps every failure to one [`FailureKind`](crate::FailureKind) so
//! the retry loop only asks a single question: is this retryable?

mod classify;
mod policy;
mod transport;

pub use classify::{classify, classify_curl_error};
pub use policy::{RetryDecision, RetryPolicy, TimeUnit};
pub use transport::{RetryingTransport, RetryingTransportBuilder};
