//! Retry configuration, delay calculation, and the rate-limit invoker.
//!
//! [`RetryingInvoker`] wraps a single upstream call with bounded exponential
//! backoff plus jitter. Only rate-limit failures (see
//! [`KrishiError::is_rate_limit()`]) are retried; every other error is
//! returned immediately. Running out of attempts is not an error: the caller
//! receives [`Invocation::Exhausted`] carrying a user-safe message and is
//! expected to render it as a degraded result.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tracing::warn;

use crate::telemetry;
use crate::{KrishiError, Result};

/// User-facing message attached to [`Invocation::Exhausted`].
pub const RESOURCE_EXHAUSTED_MESSAGE: &str = "The service is receiving too many requests right now. \
     Please try again in a minute.";

/// Configuration for retry behaviour on rate-limit errors.
///
/// The delay before retry *i* (1-indexed) is
/// `base_delay * 2^(i-1)` (capped at `max_delay`) plus a uniformly random
/// jitter in `[0, jitter)`.
///
/// ```rust
/// # use krishi::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_retries(3)
///     .base_delay(Duration::from_millis(200))
///     .jitter(Duration::ZERO);
/// assert_eq!(config.delay_for_retry(2), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first call. Default: 5.
    pub max_retries: u32,
    /// Delay before the first retry. Default: 2s.
    pub base_delay: Duration,
    /// Upper bound (exclusive) of the random jitter added to each delay.
    /// Default: 1s.
    pub jitter: Duration,
    /// Cap on the exponential part of the delay. Default: 60s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(2),
            jitter: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that makes a single attempt.
    pub fn disabled() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the first call). Values below 1 are
    /// treated as 1.
    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the jitter window. `Duration::ZERO` disables jitter.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the cap on the exponential part of the delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff before retry `retry` (1-indexed), without jitter.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.max_delay)
    }

    /// Full delay before retry `retry`: provider `retry_after` hint if
    /// present, otherwise the backoff, plus jitter.
    pub fn effective_delay(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = retry_after.unwrap_or_else(|| self.delay_for_retry(retry));
        backoff + self.sample_jitter()
    }

    /// Worst-case time spent sleeping if every attempt is rate-limited and no
    /// provider hints are given (jitter included at its upper bound).
    pub fn worst_case_backoff(&self) -> Duration {
        (1..self.attempts())
            .map(|retry| self.delay_for_retry(retry) + self.jitter)
            .sum()
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    fn sample_jitter(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let fraction: f64 = rand::thread_rng().gen_range(0.0..1.0);
        self.jitter.mul_f64(fraction)
    }
}

/// Outcome of a retried call that did not fail permanently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Invocation<T> {
    /// The call succeeded (possibly after retries).
    Completed(T),
    /// Every attempt was rate-limited. A valid, degraded result.
    Exhausted { attempts: u32, message: String },
}

impl<T> Invocation<T> {
    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Invocation::Completed(value) => Some(value),
            Invocation::Exhausted { .. } => None,
        }
    }

    /// Whether retries ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Invocation::Exhausted { .. })
    }

    /// Map the completed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Invocation<U> {
        match self {
            Invocation::Completed(value) => Invocation::Completed(f(value)),
            Invocation::Exhausted { attempts, message } => {
                Invocation::Exhausted { attempts, message }
            }
        }
    }
}

/// Per-call retry bookkeeping. Discarded once the call resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryState {
    /// 1-indexed attempt about to run.
    pub attempt: u32,
    /// Delay slept before this attempt.
    pub next_delay: Duration,
}

impl RetryState {
    fn first() -> Self {
        Self {
            attempt: 1,
            next_delay: Duration::ZERO,
        }
    }
}

/// Wraps upstream calls with rate-limit retry.
#[derive(Debug, Clone, Default)]
pub struct RetryingInvoker {
    config: RetryConfig,
}

impl RetryingInvoker {
    /// Create an invoker with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `f`, retrying rate-limit failures with backoff.
    ///
    /// - `Ok(Invocation::Completed)`: `f` succeeded.
    /// - `Ok(Invocation::Exhausted)`: every attempt was rate-limited.
    /// - `Err(e)`: `f` failed with a non-rate-limit error (not retried).
    pub async fn invoke<F, Fut, T>(
        &self,
        upstream: &str,
        operation: &str,
        f: F,
    ) -> Result<Invocation<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.config.attempts();
        let mut state = RetryState::first();
        loop {
            match f().await {
                Ok(value) => return Ok(Invocation::Completed(value)),
                Err(e) if e.is_rate_limit() => {
                    if state.attempt >= attempts {
                        metrics::counter!(telemetry::RETRY_EXHAUSTED_TOTAL,
                            "upstream" => upstream.to_owned(),
                            "operation" => operation.to_owned(),
                        )
                        .increment(1);
                        warn!(
                            upstream,
                            operation,
                            attempts,
                            "rate limit persisted through every attempt, giving up"
                        );
                        return Ok(Invocation::Exhausted {
                            attempts,
                            message: RESOURCE_EXHAUSTED_MESSAGE.to_string(),
                        });
                    }
                    state = self.next_state(state, &e);
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "upstream" => upstream.to_owned(),
                        "operation" => operation.to_owned(),
                    )
                    .increment(1);
                    warn!(
                        upstream,
                        operation,
                        attempt = state.attempt,
                        max_attempts = attempts,
                        delay_ms = state.next_delay.as_millis() as u64,
                        error = %e,
                        "retrying after rate limit"
                    );
                    tokio::time::sleep(state.next_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn next_state(&self, current: RetryState, err: &KrishiError) -> RetryState {
        RetryState {
            attempt: current.attempt + 1,
            next_delay: self
                .config
                .effective_delay(current.attempt, err.retry_after()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_delays_double_from_two_seconds() {
        let config = RetryConfig::default().jitter(Duration::ZERO);
        let delays: Vec<_> = (1..=5).map(|i| config.delay_for_retry(i)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
                Duration::from_secs(16),
                Duration::from_secs(32),
            ]
        );
    }

    #[test]
    fn jitter_stays_within_window() {
        let config = RetryConfig::default();
        for _ in 0..100 {
            let delay = config.effective_delay(1, None);
            assert!(delay >= Duration::from_secs(2));
            assert!(delay < Duration::from_secs(3));
        }
    }

    #[test]
    fn retry_after_hint_replaces_backoff() {
        let config = RetryConfig::default().jitter(Duration::ZERO);
        assert_eq!(
            config.effective_delay(4, Some(Duration::from_millis(250))),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn worst_case_sums_gaps_between_attempts() {
        let config = RetryConfig::default().jitter(Duration::ZERO);
        // 2 + 4 + 8 + 16 between five attempts
        assert_eq!(config.worst_case_backoff(), Duration::from_secs(30));
    }

    #[test]
    fn invocation_map_preserves_exhaustion() {
        let exhausted: Invocation<u8> = Invocation::Exhausted {
            attempts: 5,
            message: "busy".into(),
        };
        let mapped = exhausted.map(|v| v.to_string());
        assert!(mapped.is_exhausted());
        assert_eq!(Invocation::Completed(2).map(|v| v * 2).completed(), Some(4));
    }
}
