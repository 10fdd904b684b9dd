//! Local retry of idempotent storage steps.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tracing::warn;

use crate::error::DomainError;

/// How often, and how patiently, an idempotent operation is retried after a
/// storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never less than one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after that, with jitter.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// The backoff schedule: `max_attempts - 1` delays starting at `backoff`.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBuilder {
        let retries = usize::try_from(self.max_attempts.saturating_sub(1)).unwrap_or(usize::MAX);
        ExponentialBuilder::default()
            .with_min_delay(self.backoff)
            .with_max_delay(self.backoff.saturating_mul(8))
            .with_max_times(retries)
            .with_jitter()
    }

    /// Runs `operation`, retrying while it fails with a retryable error.
    ///
    /// Deterministic errors are returned immediately. Once attempts are
    /// exhausted, the last error is returned.
    ///
    /// # Errors
    ///
    /// Returns the operation's error.
    pub async fn run<T, F, Fut>(&self, label: &str, operation: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        operation
            .retry(self.backoff())
            .when(DomainError::is_retryable)
            .notify(|err: &DomainError, delay: Duration| {
                warn!(operation = label, error = %err, ?delay, "retrying after storage failure");
            })
            .await
    }
}
