//! Classify transport failures for retry decisions and diagnostics.

use crate::error::{FailureKind, TransportError};

/// Classify a curl error.
pub fn classify_curl_error(e: &curl::Error) -> FailureKind {
    if e.is_operation_timedout() {
        return FailureKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return FailureKind::Connection;
    }
    FailureKind::Other
}

/// Classify any transport failure.
pub fn classify(e: &TransportError) -> FailureKind {
    match e {
        TransportError::Invalid(_) => FailureKind::Invalid,
        TransportError::Curl(ce) => classify_curl_error(ce),
        TransportError::NoResponse => FailureKind::Connection,
        TransportError::Timeout(_) => FailureKind::Timeout,
        TransportError::Io(_) => FailureKind::Io,
        TransportError::Multi(_)
        | TransportError::Form(_)
        | TransportError::Aborted
        | TransportError::Worker(_) => FailureKind::Other,
    }
}
