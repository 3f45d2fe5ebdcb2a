//! Tests for retry configuration and delay calculation.

use std::time::Duration;

use krishi::RetryConfig;

#[test]
fn defaults() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 5);
    assert_eq!(config.base_delay, Duration::from_secs(2));
    assert_eq!(config.jitter, Duration::from_secs(1));
    assert_eq!(config.max_delay, Duration::from_secs(60));
}

#[test]
fn builder_methods() {
    let config = RetryConfig::new()
        .max_retries(3)
        .base_delay(Duration::from_millis(100))
        .jitter(Duration::from_millis(10))
        .max_delay(Duration::from_secs(5));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.base_delay, Duration::from_millis(100));
    assert_eq!(config.jitter, Duration::from_millis(10));
    assert_eq!(config.max_delay, Duration::from_secs(5));
}

#[test]
fn disabled_has_single_attempt() {
    let config = RetryConfig::disabled();
    assert_eq!(config.max_retries, 1);
    assert_eq!(config.worst_case_backoff(), Duration::ZERO);
}

#[test]
fn zero_attempts_behaves_like_one() {
    let config = RetryConfig::new().max_retries(0);
    assert_eq!(config.worst_case_backoff(), Duration::ZERO);
}

#[test]
fn delay_is_capped() {
    let config = RetryConfig::new()
        .base_delay(Duration::from_secs(10))
        .max_delay(Duration::from_secs(15))
        .jitter(Duration::ZERO);
    assert_eq!(config.delay_for_retry(1), Duration::from_secs(10));
    assert_eq!(config.delay_for_retry(2), Duration::from_secs(15));
    assert_eq!(config.delay_for_retry(10), Duration::from_secs(15));
}

#[test]
fn huge_retry_index_does_not_overflow() {
    let config = RetryConfig::new().jitter(Duration::ZERO);
    assert_eq!(config.delay_for_retry(u32::MAX), config.max_delay);
}

#[test]
fn worst_case_includes_jitter_bound() {
    let config = RetryConfig::new()
        .max_retries(3)
        .base_delay(Duration::from_secs(1))
        .jitter(Duration::from_millis(500));
    // (1 + 0.5) + (2 + 0.5)
    assert_eq!(config.worst_case_backoff(), Duration::from_secs(4));
}
