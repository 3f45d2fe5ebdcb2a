//! Krishi error types

use std::time::Duration;

/// Krishi error types.
///
/// The enum is `Clone` so that upstream failures can be memoized alongside
/// successful results (see [`crate::cache::MemoCache`]).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KrishiError {
    // Caller-correctable errors
    #[error("not found: {0}")]
    NotFound(String),

    #[error("crop not found in our database: {0}")]
    UnknownCrop(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    // Upstream errors
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Missing or rejected credentials for an upstream. Not retried; the
    /// upstream runs in fallback mode instead.
    #[error("{upstream} is not configured: {reason}")]
    Misconfigured {
        upstream: &'static str,
        reason: String,
    },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl KrishiError {
    /// Whether this failure is an upstream rate-limit signal.
    ///
    /// Only rate-limit failures are retried by
    /// [`RetryingInvoker`](crate::providers::retry::RetryingInvoker).
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, KrishiError::RateLimited { .. })
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            KrishiError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            KrishiError::NotFound(_)
                | KrishiError::UnknownCrop(_)
                | KrishiError::Validation(_)
                | KrishiError::Unauthorized(_)
        )
    }

    /// HTTP status equivalent, for collaborators that expose the core over HTTP.
    pub fn status_code(&self) -> u16 {
        match self {
            KrishiError::NotFound(_) | KrishiError::UnknownCrop(_) => 404,
            KrishiError::Validation(_) => 400,
            KrishiError::Unauthorized(_) => 401,
            KrishiError::RateLimited { .. } => 429,
            KrishiError::Unavailable(_) => 502,
            KrishiError::Misconfigured { .. } | KrishiError::Configuration(_) => 500,
        }
    }
}

impl From<reqwest::Error> for KrishiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            KrishiError::Unavailable(format!("request timed out: {err}"))
        } else if err.is_decode() {
            KrishiError::Unavailable(format!("malformed response: {err}"))
        } else {
            KrishiError::Unavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for KrishiError {
    fn from(err: serde_json::Error) -> Self {
        KrishiError::Unavailable(format!("malformed response: {err}"))
    }
}

/// Result type alias for Krishi operations
pub type Result<T> = std::result::Result<T, KrishiError>;
