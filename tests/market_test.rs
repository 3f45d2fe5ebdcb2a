//! Tests for market prices and the fallback dataset.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use krishi::providers::MarketPriceProvider;
use krishi::{
    AggregationPipeline, FallbackReason, KrishiError, MarketQuery, PipelineSettings, PriceRecord,
    PriceSource, Result, RetryConfig, Upstreams,
};

// ============================================================================
// Stub feed
// ============================================================================

enum Behaviour {
    Records,
    Empty,
    RateLimited,
    Rejected,
    Down,
}

struct StubFeed {
    calls: AtomicU32,
    behaviour: Behaviour,
}

impl StubFeed {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            behaviour,
        })
    }
}

#[async_trait]
impl MarketPriceProvider for StubFeed {
    fn name(&self) -> &str {
        "stub-feed"
    }

    async fn fetch(&self, query: &MarketQuery) -> Result<Vec<PriceRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Records => Ok(vec![PriceRecord {
                commodity: query.commodity.clone().unwrap_or_else(|| "Onion".to_string()),
                state: query.state.clone().unwrap_or_else(|| "Maharashtra".to_string()),
                market: "Lasalgaon".to_string(),
                price: "1850".to_string(),
                date: "29/10/2025".to_string(),
            }]),
            Behaviour::Empty => Ok(Vec::new()),
            Behaviour::RateLimited => Err(KrishiError::RateLimited { retry_after: None }),
            Behaviour::Rejected => Err(KrishiError::Misconfigured {
                upstream: "data.gov.in",
                reason: "API key rejected (HTTP 403)".to_string(),
            }),
            Behaviour::Down => Err(KrishiError::Unavailable("HTTP 503".to_string())),
        }
    }
}

fn pipeline(feed: &Arc<StubFeed>) -> AggregationPipeline {
    AggregationPipeline::new(
        Upstreams::new().with_market(feed.clone()),
        PipelineSettings::new().retry(
            RetryConfig::new()
                .max_retries(2)
                .base_delay(Duration::from_millis(1))
                .jitter(Duration::ZERO),
        ),
    )
}

fn fallback_reason(source: PriceSource) -> Option<FallbackReason> {
    match source {
        PriceSource::Fallback { reason } => Some(reason),
        PriceSource::Live => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn live_records_are_served_and_cached() {
    let feed = StubFeed::new(Behaviour::Records);
    let pipeline = pipeline(&feed);
    let query = MarketQuery::new().state("Maharashtra").commodity("Onion");

    let first = pipeline.market_prices(&query).await;
    let second = pipeline.market_prices(&query).await;

    assert_eq!(first.source, PriceSource::Live);
    assert_eq!(first.records[0].market, "Lasalgaon");
    assert_eq!(first, second);
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn different_filters_are_cached_apart() {
    let feed = StubFeed::new(Behaviour::Records);
    let pipeline = pipeline(&feed);

    pipeline
        .market_prices(&MarketQuery::new().commodity("Onion"))
        .await;
    pipeline
        .market_prices(&MarketQuery::new().commodity("Tomato"))
        .await;

    assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unconfigured_feed_serves_fallback() {
    let pipeline = AggregationPipeline::new(Upstreams::new(), PipelineSettings::new());

    let prices = pipeline.market_prices(&MarketQuery::new()).await;

    assert_eq!(
        fallback_reason(prices.source),
        Some(FallbackReason::NotConfigured)
    );
    assert!(!prices.records.is_empty());
}

#[tokio::test]
async fn empty_result_serves_fallback() {
    let feed = StubFeed::new(Behaviour::Empty);
    let prices = pipeline(&feed)
        .market_prices(&MarketQuery::new().commodity("Saffron"))
        .await;

    assert_eq!(fallback_reason(prices.source), Some(FallbackReason::NoRecords));
    assert_eq!(prices.records.len(), 4);
}

#[tokio::test]
async fn rate_limit_exhaustion_serves_fallback() {
    let feed = StubFeed::new(Behaviour::RateLimited);
    let prices = pipeline(&feed).market_prices(&MarketQuery::new()).await;

    assert_eq!(fallback_reason(prices.source), Some(FallbackReason::RateLimited));
    assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejected_key_serves_fallback() {
    let feed = StubFeed::new(Behaviour::Rejected);
    let prices = pipeline(&feed).market_prices(&MarketQuery::new()).await;

    assert_eq!(fallback_reason(prices.source), Some(FallbackReason::Unauthorized));
    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn outage_serves_fallback() {
    let feed = StubFeed::new(Behaviour::Down);
    let prices = pipeline(&feed).market_prices(&MarketQuery::new()).await;

    assert_eq!(fallback_reason(prices.source), Some(FallbackReason::Unavailable));
    assert!(prices.is_fallback());
}

/// Fallback answers are cached briefly so the feed is not hammered.
#[tokio::test]
async fn fallback_is_cached_for_failure_ttl() {
    let feed = StubFeed::new(Behaviour::Down);
    let pipeline = pipeline(&feed);

    pipeline.market_prices(&MarketQuery::new()).await;
    pipeline.market_prices(&MarketQuery::new()).await;

    assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
}
