//! Upstream traits, one per external dependency.
//!
//! Each adapter translates one upstream's wire format into the types in
//! [`crate::types`] and classifies failures into the crate error taxonomy:
//!
//! - `NotFound`: the upstream does not know the requested entity
//! - `RateLimited`: retried by [`RetryingInvoker`](super::retry::RetryingInvoker)
//! - `Unavailable`: network failure, timeout, malformed response
//! - `Misconfigured`: credentials missing or rejected
//!
//! Adapters issue exactly one outbound call per invocation. They know
//! nothing about caching or retries; the pipeline layers those on top.

use async_trait::async_trait;

use crate::Result;
use crate::types::{CurrentWeather, ForecastSet, MarketQuery, PriceRecord, Prompt};

// ============================================================================
// Weather
// ============================================================================

/// Current conditions and multi-day forecast by city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Current weather for `city`. Unknown cities yield `NotFound`.
    async fn current(&self, city: &str) -> Result<CurrentWeather>;

    /// Daily forecast for `city`. Unknown cities yield `NotFound`.
    async fn forecast(&self, city: &str) -> Result<ForecastSet>;
}

// ============================================================================
// Generative advisory
// ============================================================================

/// Text generation from a prompt (optionally with an image).
#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Generate a text response.
    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}

// ============================================================================
// Market prices
// ============================================================================

/// Commodity price feed.
#[async_trait]
pub trait MarketPriceProvider: Send + Sync {
    /// Provider name for logging/metrics.
    fn name(&self) -> &str;

    /// Fetch price records matching `query`.
    ///
    /// Zero matching records is `Ok(vec![])`, distinct from a transport
    /// failure.
    async fn fetch(&self, query: &MarketQuery) -> Result<Vec<PriceRecord>>;
}
