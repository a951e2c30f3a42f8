//! Transport: executes one attempt of a multipart POST under a wall-clock deadline.
//!
//! curl only bounds individual phases, so the whole exchange runs on a detached
//! worker thread that owns its inputs while the caller waits with a bounded wait.
//! On deadline or interrupt the caller aborts the exchange and returns at once;
//! the worker unwinds on its own (body reads fail, its result is discarded).

mod attempt;
mod collector;
mod exchange;
mod parse;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::control::{AbortToken, POLL_SLICE};
use crate::error::TransportError;
use crate::handler::CompletionHandler;
use crate::request::{Config, RequestDescriptor};

const WORKER_NAME: &str = "cbi-attempt";

/// Sends a request and reports the outcome of the attempt(s).
///
/// `Ok(true)`: the success handler ran and accepted the body. `Ok(false)`: the
/// server rejected the request (the error handler ran), the success handler
/// declined, or the caller was interrupted (no handler ran). `Err`: the attempt
/// failed without a usable response.
///
/// The handler is shared with the attempt's worker, which may outlive the call
/// when the deadline expires while a callback is still running.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &RequestDescriptor,
        handler: Arc<dyn CompletionHandler>,
    ) -> Result<bool, TransportError> {
        self.send_with(request, &Config::default(), handler)
    }

    fn send_with(
        &self,
        request: &RequestDescriptor,
        config: &Config,
        handler: Arc<dyn CompletionHandler>,
    ) -> Result<bool, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send_with(
        &self,
        request: &RequestDescriptor,
        config: &Config,
        handler: Arc<dyn CompletionHandler>,
    ) -> Result<bool, TransportError> {
        (**self).send_with(request, config, handler)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_with(
        &self,
        request: &RequestDescriptor,
        config: &Config,
        handler: Arc<dyn CompletionHandler>,
    ) -> Result<bool, TransportError> {
        (**self).send_with(request, config, handler)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send_with(
        &self,
        request: &RequestDescriptor,
        config: &Config,
        handler: Arc<dyn CompletionHandler>,
    ) -> Result<bool, TransportError> {
        (**self).send_with(request, config, handler)
    }
}

/// libcurl-backed transport. Holds no connection state between calls.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    user_agent: String,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            user_agent: concat!("cbi/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

enum Waited {
    Finished(Result<bool, TransportError>),
    TimedOut(Duration),
    Interrupted,
    /// The worker dropped its sender without reporting (it panicked).
    Lost,
}

impl Transport for CurlTransport {
    fn send_with(
        &self,
        request: &RequestDescriptor,
        config: &Config,
        handler: Arc<dyn CompletionHandler>,
    ) -> Result<bool, TransportError> {
        if config.interrupt.is_interrupted() {
            tracing::debug!("caller is interrupted, request to '{}' not sent", request.server_uri());
            return Ok(false);
        }
        tracing::debug!("Will send request to '{}'", request.server_uri());

        let started = Instant::now();
        let abort = AbortToken::new();
        let (tx, rx) = mpsc::channel();

        let worker = {
            let abort = abort.clone();
            let user_agent = self.user_agent.clone();
            let request = request.clone();
            let config = config.clone();
            thread::Builder::new()
                .name(WORKER_NAME.to_string())
                .spawn(move || {
                    let res = attempt::run(&user_agent, &request, &config, &*handler, &abort);
                    let _ = tx.send(res);
                })?
        };

        let outcome = match wait_for_worker(&rx, config, started) {
            Waited::Finished(res) => res,
            Waited::TimedOut(limit) => {
                abort.abort();
                tracing::debug!("request to '{}' timed out after {:?}", request.server_uri(), limit);
                Err(TransportError::Timeout(limit))
            }
            Waited::Interrupted => {
                abort.abort();
                tracing::debug!("request to '{}' interrupted by caller", request.server_uri());
                Ok(false)
            }
            // The sender is gone, so the worker is already unwinding.
            Waited::Lost => Err(TransportError::Worker(match worker.join() {
                Err(payload) => panic_message(payload.as_ref()),
                Ok(()) => "worker exited without a result".to_string(),
            })),
        };

        tracing::debug!("HTTP request and response handled in {:?}", started.elapsed());
        outcome
    }
}

fn wait_for_worker(
    rx: &Receiver<Result<bool, TransportError>>,
    config: &Config,
    started: Instant,
) -> Waited {
    loop {
        let slice = match config.timeout {
            Some(limit) => {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return match rx.try_recv() {
                        Ok(res) => Waited::Finished(res),
                        Err(_) => Waited::TimedOut(limit),
                    };
                }
                (limit - elapsed).min(POLL_SLICE)
            }
            None => POLL_SLICE,
        };
        match rx.recv_timeout(slice) {
            Ok(res) => return Waited::Finished(res),
            Err(RecvTimeoutError::Timeout) => {
                if config.interrupt.is_interrupted() {
                    return Waited::Interrupted;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return Waited::Lost,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
