//! Tests for building the application context from config and secrets.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use krishi::config::{Config, Secrets};
use krishi::{
    CacheConfig, FallbackReason, Krishi, KrishiBuilder, KrishiError, MarketQuery, PipelineStage,
    PriceSource, RetryConfig, UpstreamStatus,
};

#[test]
fn builder_without_keys_runs_in_fallback_mode() {
    let ctx = Krishi::builder().build().unwrap();
    assert_eq!(
        ctx.upstream_status(),
        UpstreamStatus {
            weather: false,
            advisory: false,
            market: false,
        }
    );
}

#[test]
fn blank_keys_count_as_missing() {
    let ctx = Krishi::builder().openweather("   ").gemini("gem-key").build().unwrap();
    let status = ctx.upstream_status();
    assert!(!status.weather);
    assert!(status.advisory);
}

#[test]
fn zero_cache_capacity_is_rejected() {
    let result = Krishi::builder()
        .cache(CacheConfig::new().max_entries(0))
        .build();
    assert!(matches!(result, Err(KrishiError::Configuration(_))));
}

#[test]
fn configured_crops_reach_the_pipeline() {
    let config: Config = toml::from_str(
        r#"
            [crops.onion]
            n = 100.0
            p = 50.0
            k = 100.0
        "#,
    )
    .unwrap();
    let ctx = KrishiBuilder::from_config(&config, &Secrets::default())
        .build()
        .unwrap();

    assert!(ctx.crops().get("Onion").is_some());
    assert!(ctx.pipeline().fertilizer_plan(0.0, 0.0, 0.0, "onion").is_ok());
}

#[test]
fn retry_and_timeout_settings_are_applied() {
    let config: Config = toml::from_str(
        r#"
            [retry]
            max_retries = 2
            base_delay_ms = 10
            jitter_ms = 0
        "#,
    )
    .unwrap();
    let ctx = KrishiBuilder::from_config(&config, &Secrets::default())
        .build()
        .unwrap();

    assert_eq!(
        ctx.pipeline().retry_config(),
        &RetryConfig::new()
            .max_retries(2)
            .base_delay(Duration::from_millis(10))
            .jitter(Duration::ZERO)
    );
}

#[tokio::test]
async fn missing_market_key_serves_fallback() {
    let ctx = Krishi::builder().build().unwrap();
    let prices = ctx.pipeline().market_prices(&MarketQuery::new()).await;
    assert_eq!(
        prices.source,
        PriceSource::Fallback {
            reason: FallbackReason::NotConfigured
        }
    );
}

/// A custom base URL points the real adapter at a mock server.
#[tokio::test]
async fn weather_flows_through_configured_adapter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cod": 200,
            "name": "Nashik",
            "main": {"temp": 27.0, "humidity": 60},
            "weather": [{"description": "mist", "icon": "50n"}],
            "wind": {"speed": 1.0}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cod": "200",
            "city": {"timezone": 19800},
            "list": [{
                "dt": 1_761_782_400_i64,
                "main": {"temp_min": 18.0, "temp_max": 29.0},
                "weather": [{"description": "mist", "icon": "50n"}]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = Krishi::builder()
        .openweather("owm-key")
        .openweather_url(server.uri())
        .build()
        .unwrap();

    let report = ctx.pipeline().weather("Nashik").await.unwrap();
    // No advisory key: weather and forecast only.
    assert_eq!(report.stage(), PipelineStage::ForecastFetched);
    assert_eq!(report.current.as_ref().unwrap().city_name, "Nashik");
    assert_eq!(report.forecast.as_ref().unwrap().len(), 1);

    // Second request is served from cache (mocks expect one call each).
    ctx.pipeline().weather("Nashik").await.unwrap();
}
