//! Retry decorator around any [`Transport`].

use std::sync::Arc;

use crate::error::TransportError;
use crate::handler::CompletionHandler;
use crate::request::{Config, RequestDescriptor};
use crate::transport::Transport;

use super::policy::{RetryDecision, RetryPolicy, TimeUnit};

/// Repeats the delegate's attempt up to `max_retries + 1` times, sleeping the
/// retry interval between attempts (never before the first).
///
/// Attempts are strictly sequential. A sleep cut short by the caller's
/// [`Interrupt`](crate::Interrupt) stops the loop and surfaces the last
/// outcome; the interrupt stays set. After the last attempt its error is
/// re-raised unchanged, otherwise its boolean is returned.
#[derive(Debug, Clone)]
pub struct RetryingTransport<T> {
    delegate: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingTransport<T> {
    pub fn retry_request_on(delegate: T) -> RetryingTransportBuilder<T> {
        RetryingTransportBuilder {
            delegate,
            max_retries: 0,
            retry_interval: 0,
            retry_interval_unit: TimeUnit::Seconds,
        }
    }

    pub fn with_policy(delegate: T, policy: RetryPolicy) -> Self {
        Self { delegate, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<T: Transport> Transport for RetryingTransport<T> {
    fn send_with(
        &self,
        request: &RequestDescriptor,
        config: &Config,
        handler: Arc<dyn CompletionHandler>,
    ) -> Result<bool, TransportError> {
        let max_retries = self.policy.max_retries;
        let mut attempt = 1u32;
        loop {
            let outcome = self.delegate.send_with(request, config, Arc::clone(&handler));
            let failure = match &outcome {
                Ok(true) => return outcome,
                Ok(false) => None,
                Err(e) => Some(e.kind()),
            };
            let delay = match self.policy.decide(attempt, failure) {
                RetryDecision::NoRetry => return outcome,
                RetryDecision::RetryAfter(d) => d,
            };
            match &outcome {
                Err(e) => tracing::warn!(
                    error = %e,
                    "An exception has been thrown, but the request will be retried (attempt {} / {})",
                    attempt,
                    max_retries
                ),
                Ok(_) => tracing::debug!(
                    "The previous request did not complete successfully, but it will be retried (attempt {} / {})",
                    attempt,
                    max_retries
                ),
            }
            if config.interrupt.sleep(delay).is_err() {
                tracing::warn!(
                    "Thread '{}' has been interrupted, giving up after {} attempt(s)",
                    std::thread::current().name().unwrap_or("<unnamed>"),
                    attempt
                );
                return outcome;
            }
            attempt += 1;
        }
    }
}

/// Builder returned by [`RetryingTransport::retry_request_on`]; validates at `build`.
#[derive(Debug)]
pub struct RetryingTransportBuilder<T> {
    delegate: T,
    max_retries: i64,
    retry_interval: i64,
    retry_interval_unit: TimeUnit,
}

impl<T: Transport> RetryingTransportBuilder<T> {
    pub fn max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn wait_before_retry(mut self, retry_interval: i64, unit: TimeUnit) -> Self {
        self.retry_interval = retry_interval;
        self.retry_interval_unit = unit;
        self
    }

    /// Fails with `Invalid` when `max_retries` or the interval is negative.
    pub fn build(self) -> Result<RetryingTransport<T>, TransportError> {
        let policy = RetryPolicy::from_settings(
            self.max_retries,
            self.retry_interval,
            self.retry_interval_unit,
        )?;
        Ok(RetryingTransport::with_policy(self.delegate, policy))
    }
}
