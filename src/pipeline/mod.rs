//! Aggregation pipeline: cache + retry around the upstreams.
//!
//! A weather request moves through
//! `Start → WeatherFetched → ForecastFetched → AdviceReady → Composed`.
//! Each step goes through a [`MemoCache`] and the [`RetryingInvoker`]:
//!
//! - weather `NotFound`/`Unavailable` aborts with an error; retry
//!   exhaustion yields a degraded report with nothing in it but the reason
//! - a forecast failure returns current weather alone (advice needs both)
//! - advice is keyed by the canonicalized weather + forecast content, so it
//!   is recomputed exactly when the underlying weather changes
//!
//! The dashboard ([`dashboard`]), market prices ([`market`]) and the AI
//! helpers ([`advisor`]) are layered on the same caches and invoker.

pub mod advisor;
pub mod dashboard;
pub mod market;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::agronomy::{CropTable, FertilizerPlan, SoilReading};
use crate::cache::{CacheConfig, CacheKey, MemoCache};
use crate::providers::{
    AdvisoryProvider, Invocation, MarketPriceProvider, RetryConfig, RetryingInvoker,
    WeatherProvider,
};
use crate::types::{
    CropRecommendation, CurrentWeather, DashboardView, FertilityReport, ForecastSet,
    MarketPrices, PipelineStage, ReportStatus, WeatherReport, WeatherSnapshot,
};
use crate::{KrishiError, Result};

/// The upstreams available to the pipeline. `None` means the upstream has
/// no credentials and its features run in fallback mode.
#[derive(Clone, Default)]
pub struct Upstreams {
    pub weather: Option<Arc<dyn WeatherProvider>>,
    pub advisory: Option<Arc<dyn AdvisoryProvider>>,
    pub market: Option<Arc<dyn MarketPriceProvider>>,
}

impl Upstreams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weather(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.weather = Some(provider);
        self
    }

    pub fn with_advisory(mut self, provider: Arc<dyn AdvisoryProvider>) -> Self {
        self.advisory = Some(provider);
        self
    }

    pub fn with_market(mut self, provider: Arc<dyn MarketPriceProvider>) -> Self {
        self.market = Some(provider);
        self
    }
}

/// Pipeline tuning: caches, retries, crop table and request deadline.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub cache: CacheConfig,
    pub retry: RetryConfig,
    pub crops: CropTable,
    /// Overall deadline for weather and dashboard requests.
    pub request_timeout: Option<Duration>,
}

impl PipelineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn crops(mut self, crops: CropTable) -> Self {
        self.crops = crops;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

type Memo<T> = MemoCache<Result<Invocation<T>>>;

/// Cached, retried access to every upstream plus the agronomy engine.
pub struct AggregationPipeline {
    upstreams: Upstreams,
    invoker: RetryingInvoker,
    cache_config: CacheConfig,
    crops: CropTable,
    request_timeout: Option<Duration>,
    weather_cache: Memo<CurrentWeather>,
    forecast_cache: Memo<ForecastSet>,
    advice_cache: Memo<String>,
    news_cache: Memo<String>,
    recommendation_cache: Memo<CropRecommendation>,
    market_cache: MemoCache<MarketPrices>,
    dashboard_cache: MemoCache<DashboardView>,
}

impl AggregationPipeline {
    pub fn new(upstreams: Upstreams, settings: PipelineSettings) -> Self {
        let cap = settings.cache.max_entries;
        Self {
            upstreams,
            invoker: RetryingInvoker::new(settings.retry),
            request_timeout: settings.request_timeout,
            crops: settings.crops,
            weather_cache: MemoCache::new("weather", cap),
            forecast_cache: MemoCache::new("forecast", cap),
            advice_cache: MemoCache::new("advice", cap),
            news_cache: MemoCache::new("news", cap),
            recommendation_cache: MemoCache::new("recommendation", cap),
            market_cache: MemoCache::new("market", cap),
            dashboard_cache: MemoCache::new("dashboard", cap),
            cache_config: settings.cache,
        }
    }

    pub fn upstreams(&self) -> &Upstreams {
        &self.upstreams
    }

    pub fn crops(&self) -> &CropTable {
        &self.crops
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.invoker.config()
    }

    // ========================================================================
    // Weather flow
    // ========================================================================

    /// Current weather for `city`, cached and retried.
    pub async fn current_weather(&self, city: &str) -> Result<Invocation<CurrentWeather>> {
        let city = required(city, "city")?;
        let provider = weather_upstream(&self.upstreams)?;
        let key = CacheKey::new("weather", &[city]);
        self.cached_invoke(
            &self.weather_cache,
            &key,
            self.cache_config.weather_ttl,
            provider.name(),
            "current",
            move || provider.current(city),
        )
        .await
    }

    /// Daily forecast for `city`, cached and retried.
    pub async fn forecast(&self, city: &str) -> Result<Invocation<ForecastSet>> {
        let city = required(city, "city")?;
        let provider = weather_upstream(&self.upstreams)?;
        let key = CacheKey::new("forecast", &[city]);
        self.cached_invoke(
            &self.forecast_cache,
            &key,
            self.cache_config.forecast_ttl,
            provider.name(),
            "forecast",
            move || provider.forecast(city),
        )
        .await
    }

    /// Farming advice for the given conditions, keyed by their content.
    pub async fn advice(
        &self,
        current: &CurrentWeather,
        forecast: &ForecastSet,
    ) -> Result<Invocation<String>> {
        let provider = advisory_upstream(&self.upstreams)?;
        let key = CacheKey::composite("advice", &[&(current, forecast)])?;
        let prompt = advisor::advice_prompt(current, forecast);
        let prompt = &prompt;
        self.cached_invoke(
            &self.advice_cache,
            &key,
            self.cache_config.advice_ttl,
            provider.name(),
            "advice",
            move || provider.generate(prompt),
        )
        .await
    }

    /// Current weather, forecast and advice for `city`.
    ///
    /// Errors only when nothing could be produced: blank city, unknown city,
    /// weather upstream unavailable or unconfigured, or the request deadline
    /// passed. Every later failure degrades the report instead.
    pub async fn weather(&self, city: &str) -> Result<WeatherReport> {
        self.with_deadline(self.compose_weather(city)).await
    }

    async fn compose_weather(&self, city: &str) -> Result<WeatherReport> {
        let city = required(city, "city")?;

        let current = match self.current_weather(city).await? {
            Invocation::Completed(current) => current,
            Invocation::Exhausted { message, .. } => {
                return Ok(WeatherReport::degraded(city, PipelineStage::Start, message));
            }
        };

        let forecast = match self.forecast(city).await {
            Ok(Invocation::Completed(forecast)) => forecast,
            Ok(Invocation::Exhausted { message, .. }) => {
                return Ok(WeatherReport {
                    current: Some(current),
                    ..WeatherReport::degraded(city, PipelineStage::WeatherFetched, message)
                });
            }
            Err(e) => {
                warn!(city, error = %e, "forecast failed, returning current weather only");
                return Ok(WeatherReport {
                    current: Some(current),
                    ..WeatherReport::degraded(city, PipelineStage::WeatherFetched, e.to_string())
                });
            }
        };

        let reason = match self.advice(&current, &forecast).await {
            Ok(Invocation::Completed(advice)) => {
                return Ok(WeatherReport {
                    city: city.to_string(),
                    current: Some(current),
                    forecast: Some(forecast),
                    advice: Some(advice),
                    status: ReportStatus::Composed,
                });
            }
            Ok(Invocation::Exhausted { message, .. }) => message,
            Err(e) => {
                // No advisory key is a deployment choice; anything else is worth a log line.
                if !matches!(e, KrishiError::Misconfigured { upstream: "advisory", .. }) {
                    warn!(city, error = %e, "advice failed, returning weather without advice");
                }
                e.to_string()
            }
        };

        Ok(WeatherReport {
            current: Some(current),
            forecast: Some(forecast),
            ..WeatherReport::degraded(city, PipelineStage::ForecastFetched, reason)
        })
    }

    // ========================================================================
    // Agronomy
    // ========================================================================

    /// Classify a soil reading and attach the current weather at `location`.
    ///
    /// The weather is decoration: a failed lookup is reported inside the
    /// snapshot and never fails the report.
    pub async fn analyze_fertility_at(
        &self,
        location: &str,
        n: f64,
        p: f64,
        k: f64,
        ph: f64,
    ) -> Result<FertilityReport> {
        let location = required(location, "location")?;
        let reading = SoilReading::new(n, p, k, ph)?;

        let weather = match self.current_weather(location).await {
            Ok(Invocation::Completed(current)) => WeatherSnapshot::Available(current),
            Ok(Invocation::Exhausted { message, .. }) => {
                WeatherSnapshot::Unavailable { reason: message }
            }
            Err(e) => WeatherSnapshot::Unavailable {
                reason: e.to_string(),
            },
        };

        Ok(FertilityReport {
            location: location.to_string(),
            weather,
            assessment: reading.classify(),
        })
    }

    /// Fertilizer plan against the configured crop table.
    pub fn fertilizer_plan(&self, n: f64, p: f64, k: f64, crop: &str) -> Result<FertilizerPlan> {
        SoilReading::new(n, p, k, 7.0)?;
        self.crops.fertilizer_plan(n, p, k, crop)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Look up `key` in `cache`, or invoke `call` through the retry layer
    /// and memoize the outcome. Only completed values get `ok_ttl`;
    /// exhaustion and errors are kept for the failure TTL.
    async fn cached_invoke<T, F, Fut>(
        &self,
        cache: &Memo<T>,
        key: &CacheKey,
        ok_ttl: Duration,
        upstream: &str,
        operation: &str,
        call: F,
    ) -> Result<Invocation<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let failure_ttl = self.cache_config.failure_ttl;
        cache
            .get_or_compute_with(
                key,
                |result| match result {
                    Ok(Invocation::Completed(_)) => ok_ttl,
                    _ => failure_ttl,
                },
                || self.invoker.invoke(upstream, operation, call),
            )
            .await
    }

    async fn with_deadline<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.request_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                KrishiError::Unavailable(format!("request timed out after {}s", limit.as_secs_f32()))
            })?,
            None => fut.await,
        }
    }
}

/// Trimmed, non-blank input or a `Validation` error naming the field.
fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(KrishiError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

fn not_configured(upstream: &'static str) -> KrishiError {
    KrishiError::Misconfigured {
        upstream,
        reason: "no API key configured".to_string(),
    }
}

fn weather_upstream(upstreams: &Upstreams) -> Result<&dyn WeatherProvider> {
    upstreams
        .weather
        .as_deref()
        .ok_or_else(|| not_configured("weather"))
}

fn advisory_upstream(upstreams: &Upstreams) -> Result<&dyn AdvisoryProvider> {
    upstreams
        .advisory
        .as_deref()
        .ok_or_else(|| not_configured("advisory"))
}
