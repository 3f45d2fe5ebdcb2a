//! Upstream adapters and the retry layer.
//!
//! - [`traits`]: one trait per upstream (weather, advisory, market prices)
//! - [`openweather`], [`gemini`], [`datagov`]: HTTP implementations
//! - [`retry`]: rate-limit retry with backoff and jitter

pub mod datagov;
pub mod gemini;
pub mod openweather;
pub mod retry;
pub mod traits;

pub use datagov::DataGovClient;
pub use gemini::GeminiClient;
pub use openweather::OpenWeatherClient;
pub use retry::{Invocation, RetryConfig, RetryingInvoker};
pub use traits::{AdvisoryProvider, MarketPriceProvider, WeatherProvider};

use std::time::Duration;

use crate::telemetry;

/// Default per-request timeout for every upstream adapter.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Parse a `retry-after` header given in whole seconds.
pub(crate) fn retry_after_header(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Build an HTTP client with the adapter timeout.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("krishi/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to build HTTP client")
}

pub(crate) fn record_request<T>(upstream: &str, operation: &'static str, result: &crate::Result<T>) {
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
        "upstream" => upstream.to_owned(),
        "operation" => operation,
        "status" => status,
    )
    .increment(1);
}
