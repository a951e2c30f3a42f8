//! Body of the worker for one attempt: build, dispatch, classify, call back.

use curl::easy::{Easy2, List};

use crate::control::AbortToken;
use crate::error::TransportError;
use crate::handler::CompletionHandler;
use crate::multipart;
use crate::request::{Config, RequestDescriptor};
use crate::result::TransportResult;

use super::collector::Collector;
use super::exchange::Exchange;

/// Runs one multipart POST. The handler is called on this thread while the
/// exchange is alive, so draining the result reads straight from the socket.
pub(super) fn run(
    user_agent: &str,
    request: &RequestDescriptor,
    config: &Config,
    handler: &dyn CompletionHandler,
    abort: &AbortToken,
) -> Result<bool, TransportError> {
    let parts = multipart::parts(request);

    let mut easy = Easy2::new(Collector::new(abort.clone()));
    easy.url(request.server_uri().as_str())?;
    easy.useragent(user_agent)?;
    if !config.connect_timeout.is_zero() {
        easy.connect_timeout(config.connect_timeout)?;
    }
    // No 100-continue round trip: the body follows the headers directly.
    let mut list = List::new();
    list.append("Expect:")?;
    easy.http_headers(list)?;
    if parts.is_empty() {
        easy.post(true)?;
        easy.post_field_size(0)?;
    } else {
        easy.httppost(multipart::build_form(&parts)?)?;
    }

    let mut exchange = Exchange::start(easy, abort.clone())?;
    let head = exchange.await_headers()?;
    if abort.is_aborted() {
        return Err(TransportError::Aborted);
    }
    tracing::debug!(status = head.status, reason = %head.reason, "response headers received");

    let success = head.is_success();
    let result = TransportResult::new(head, &mut exchange);
    if success {
        Ok(handler.on_success(result)?)
    } else {
        // A rejected request stays a remote failure even if its report could not be read.
        if let Err(e) = handler.on_error(result) {
            tracing::warn!(error = %e, "error handler failed to read the rejected response");
        }
        Ok(false)
    }
}
