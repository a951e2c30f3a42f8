use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, TransportError};

/// Unit of a configured retry interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Milliseconds,
    #[default]
    Seconds,
    Minutes,
}

impl TimeUnit {
    pub fn duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Milliseconds => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
        }
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop and surface the last outcome.
    NoRetry,
    /// Attempt again after the given delay.
    RetryAfter(Duration),
}

/// Fixed-interval policy: at most `max_retries` re-attempts after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_interval: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Validate signed settings as they come from configuration.
    pub fn from_settings(
        max_retries: i64,
        retry_interval: i64,
        unit: TimeUnit,
    ) -> Result<Self, TransportError> {
        if max_retries < 0 {
            return Err(TransportError::invalid("'maxRetries' must be positive"));
        }
        if retry_interval < 0 {
            return Err(TransportError::invalid("'retryInterval' must be positive"));
        }
        let max_retries = u32::try_from(max_retries)
            .map_err(|_| TransportError::invalid("'maxRetries' is too large"))?;
        Ok(Self {
            max_retries,
            retry_interval: unit.duration(retry_interval as u64),
        })
    }

    /// Decide after attempt number `attempt` (1-based) failed.
    ///
    /// `failure` is `None` for a logical failure (`Ok(false)`), else the kind of the error.
    pub fn decide(&self, attempt: u32, failure: Option<FailureKind>) -> RetryDecision {
        if attempt > self.max_retries {
            return RetryDecision::NoRetry;
        }
        match failure {
            Some(kind) if !kind.is_retryable() => RetryDecision::NoRetry,
            _ => RetryDecision::RetryAfter(self.retry_interval),
        }
    }
}
