//! Bounded retry with exponential backoff, shared by every wait point.
//!
//! Only [`AppError::TransientRender`] is retried. The whole sequence of
//! attempts is additionally capped by an outer timeout so no wait can block
//! indefinitely.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub attempts: u32,
    /// Delay before the second attempt; doubles afterwards.
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
    /// Upper bound on the whole retry sequence.
    pub outer_timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            jitter: true,
            outer_timeout_secs: 15,
        }
    }
}

impl RetryPolicy {
    /// Policy with no delays, for simulated sessions and tests.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter: false,
            outer_timeout_secs: 5,
        }
    }

    /// Delays between attempts. `ExponentialBackoff` yields `factor * 2^n`,
    /// so a factor of half the base delay starts the sequence at the base.
    pub fn delays(&self) -> Vec<Duration> {
        let retries = self.attempts.saturating_sub(1) as usize;
        let backoff = ExponentialBackoff::from_millis(2)
            .factor(self.base_delay_ms / 2)
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .take(retries);

        if self.jitter {
            backoff.map(jitter).collect()
        } else {
            backoff.collect()
        }
    }

    pub fn outer_timeout(&self) -> Duration {
        Duration::from_secs(self.outer_timeout_secs)
    }
}

/// Run `action` until it succeeds, fails with a non-transient error, or the
/// policy is exhausted. Exhaustion surfaces the last transient error; hitting
/// the outer timeout surfaces a transient error naming `what`.
pub async fn retry_transient<T, A, Fut>(policy: &RetryPolicy, what: &str, action: A) -> Result<T>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    let condition = |err: &AppError| {
        attempt += 1;
        if err.is_transient() {
            tracing::debug!(attempt, what, error = %err, "retrying after transient error");
            true
        } else {
            false
        }
    };

    let outer = policy.outer_timeout();
    match tokio::time::timeout(outer, RetryIf::start(policy.delays(), action, condition)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::transient(format!("{} (timed out after {:?})", what, outer))),
    }
}
