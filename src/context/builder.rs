//! Builder for the application context

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::AppContext;
use crate::agronomy::{CropTable, NutrientTarget};
use crate::cache::CacheConfig;
use crate::config::{Config, Secrets};
use crate::pipeline::{AggregationPipeline, PipelineSettings, Upstreams};
use crate::providers::{
    AdvisoryProvider, DEFAULT_UPSTREAM_TIMEOUT, DataGovClient, GeminiClient, MarketPriceProvider,
    OpenWeatherClient, RetryConfig, WeatherProvider, datagov, gemini, openweather,
};
use crate::{KrishiError, Result};

/// Main entry point for creating an [`AppContext`].
pub struct Krishi;

impl Krishi {
    /// Create a new builder for configuring the context.
    pub fn builder() -> KrishiBuilder {
        KrishiBuilder::new()
    }
}

/// Builder for the application context.
pub struct KrishiBuilder {
    weather_key: Option<String>,
    gemini_key: Option<String>,
    data_gov_key: Option<String>,
    weather_url: Option<String>,
    gemini_url: Option<String>,
    data_gov_url: Option<String>,
    gemini_model: Option<String>,
    market_resource_id: Option<String>,
    weather_timeout: Duration,
    advisory_timeout: Duration,
    market_timeout: Duration,
    weather_provider: Option<Arc<dyn WeatherProvider>>,
    advisory_provider: Option<Arc<dyn AdvisoryProvider>>,
    market_provider: Option<Arc<dyn MarketPriceProvider>>,
    cache: CacheConfig,
    retry: RetryConfig,
    crops: CropTable,
    request_timeout: Option<Duration>,
}

impl KrishiBuilder {
    pub fn new() -> Self {
        Self {
            weather_key: None,
            gemini_key: None,
            data_gov_key: None,
            weather_url: None,
            gemini_url: None,
            data_gov_url: None,
            gemini_model: None,
            market_resource_id: None,
            weather_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            advisory_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            market_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            weather_provider: None,
            advisory_provider: None,
            market_provider: None,
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
            crops: CropTable::default(),
            request_timeout: None,
        }
    }

    /// Builder pre-populated from a config file and secrets.
    pub fn from_config(config: &Config, secrets: &Secrets) -> Self {
        let upstreams = &config.upstreams;
        let mut builder = Self::new()
            .cache(config.cache.to_cache_config())
            .retry(config.retry.to_retry_config())
            .crops(config.crops.iter());

        builder.weather_key = secrets.api_key("weather");
        builder.gemini_key = secrets.api_key("gemini");
        builder.data_gov_key = secrets.api_key("data_gov");

        builder.weather_url = upstreams.weather.base_url.clone();
        builder.weather_timeout = upstreams.weather.timeout();
        builder.gemini_url = upstreams.advisory.upstream.base_url.clone();
        builder.advisory_timeout = upstreams.advisory.upstream.timeout();
        builder.gemini_model = upstreams.advisory.model.clone();
        builder.data_gov_url = upstreams.market.upstream.base_url.clone();
        builder.market_timeout = upstreams.market.upstream.timeout();
        builder.market_resource_id = upstreams.market.resource_id.clone();

        if let Some(timeout) = config.pipeline.request_timeout() {
            builder = builder.request_timeout(timeout);
        }
        builder
    }

    /// Configure OpenWeatherMap.
    pub fn openweather(mut self, api_key: impl Into<String>) -> Self {
        self.weather_key = Some(api_key.into());
        self
    }

    /// Configure OpenWeatherMap against a custom base URL.
    pub fn openweather_url(mut self, url: impl Into<String>) -> Self {
        self.weather_url = Some(url.into());
        self
    }

    /// Configure Gemini.
    pub fn gemini(mut self, api_key: impl Into<String>) -> Self {
        self.gemini_key = Some(api_key.into());
        self
    }

    /// Configure Gemini against a custom base URL.
    pub fn gemini_url(mut self, url: impl Into<String>) -> Self {
        self.gemini_url = Some(url.into());
        self
    }

    /// Use a different Gemini model.
    pub fn gemini_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = Some(model.into());
        self
    }

    /// Configure the data.gov.in price feed.
    pub fn data_gov(mut self, api_key: impl Into<String>) -> Self {
        self.data_gov_key = Some(api_key.into());
        self
    }

    /// Configure data.gov.in against a custom base URL.
    pub fn data_gov_url(mut self, url: impl Into<String>) -> Self {
        self.data_gov_url = Some(url.into());
        self
    }

    /// Set the per-request timeout for every HTTP upstream.
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.weather_timeout = timeout;
        self.advisory_timeout = timeout;
        self.market_timeout = timeout;
        self
    }

    /// Use a custom weather upstream instead of OpenWeatherMap.
    pub fn weather_provider(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.weather_provider = Some(provider);
        self
    }

    /// Use a custom advisory upstream instead of Gemini.
    pub fn advisory_provider(mut self, provider: Arc<dyn AdvisoryProvider>) -> Self {
        self.advisory_provider = Some(provider);
        self
    }

    /// Use a custom market upstream instead of data.gov.in.
    pub fn market_provider(mut self, provider: Arc<dyn MarketPriceProvider>) -> Self {
        self.market_provider = Some(provider);
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Add or override crop nutrient targets.
    pub fn crops<'a>(
        mut self,
        crops: impl IntoIterator<Item = (&'a String, &'a NutrientTarget)>,
    ) -> Self {
        self.crops.extend(crops);
        self
    }

    /// Overall deadline for weather and dashboard requests.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the context.
    ///
    /// Upstreams without credentials are left out and logged once here; the
    /// features that need them run in fallback mode.
    pub fn build(self) -> Result<AppContext> {
        if self.cache.max_entries == 0 {
            return Err(KrishiError::Configuration(
                "cache max_entries must be greater than zero".to_string(),
            ));
        }

        let weather = self.weather_provider.or_else(|| {
            let key = configured("weather", self.weather_key)?;
            let url = self
                .weather_url
                .unwrap_or_else(|| openweather::DEFAULT_BASE_URL.to_string());
            Some(Arc::new(OpenWeatherClient::with_config(key, url, self.weather_timeout))
                as Arc<dyn WeatherProvider>)
        });

        let advisory = self.advisory_provider.or_else(|| {
            let key = configured("advisory", self.gemini_key)?;
            let url = self
                .gemini_url
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string());
            let mut client = GeminiClient::with_config(key, url, self.advisory_timeout);
            if let Some(model) = self.gemini_model {
                client = client.model(model);
            }
            Some(Arc::new(client) as Arc<dyn AdvisoryProvider>)
        });

        let market = self.market_provider.or_else(|| {
            let key = configured("market", self.data_gov_key)?;
            let url = self
                .data_gov_url
                .unwrap_or_else(|| datagov::DEFAULT_BASE_URL.to_string());
            let mut client = DataGovClient::with_config(key, url, self.market_timeout);
            if let Some(resource_id) = self.market_resource_id {
                client = client.resource_id(resource_id);
            }
            Some(Arc::new(client) as Arc<dyn MarketPriceProvider>)
        });

        let upstreams = Upstreams {
            weather,
            advisory,
            market,
        };

        info!(
            weather = upstreams.weather.as_ref().map(|p| p.name()),
            advisory = upstreams.advisory.as_ref().map(|p| p.name()),
            market = upstreams.market.as_ref().map(|p| p.name()),
            crops = self.crops.len(),
            "krishi context ready"
        );

        let mut settings = PipelineSettings::new()
            .cache(self.cache)
            .retry(self.retry)
            .crops(self.crops);
        settings.request_timeout = self.request_timeout;

        Ok(AppContext::new(AggregationPipeline::new(upstreams, settings)))
    }
}

impl Default for KrishiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The key if present and non-blank; otherwise logs the upstream as
/// misconfigured.
fn configured(upstream: &'static str, key: Option<String>) -> Option<String> {
    match key.filter(|k| !k.trim().is_empty()) {
        Some(key) => Some(key),
        None => {
            let err = KrishiError::Misconfigured {
                upstream,
                reason: "no API key configured".to_string(),
            };
            warn!(upstream, error = %err, "upstream disabled, running in fallback mode");
            None
        }
    }
}
