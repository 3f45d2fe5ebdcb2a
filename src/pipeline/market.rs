//! Market prices with the static fallback dataset.
//!
//! Serving fallback data is a product decision, not an error: it is logged
//! at `info` with a `fallback_reason` field and counted in
//! [`MARKET_FALLBACKS_TOTAL`](crate::telemetry::MARKET_FALLBACKS_TOTAL),
//! while genuine upstream failures also log at `warn`.

use tracing::{info, warn};

use super::AggregationPipeline;
use crate::cache::CacheKey;
use crate::providers::Invocation;
use crate::telemetry;
use crate::types::{FallbackReason, MarketPrices, MarketQuery};
use crate::KrishiError;

impl AggregationPipeline {
    /// Prices matching `query`. Never fails and never returns an empty list.
    ///
    /// Live results are cached for the market TTL; fallback results only for
    /// the failure TTL so recovery is picked up quickly.
    pub async fn market_prices(&self, query: &MarketQuery) -> MarketPrices {
        let Some(provider) = self.upstreams.market.as_deref() else {
            return serve_fallback(FallbackReason::NotConfigured, "no API key configured");
        };

        let limit = query.limit.to_string();
        let key = CacheKey::new(
            "market",
            &[
                query.state.as_deref().unwrap_or(""),
                query.commodity.as_deref().unwrap_or(""),
                &limit,
            ],
        );

        let market_ttl = self.cache_config.market_ttl;
        let failure_ttl = self.cache_config.failure_ttl;
        self.market_cache
            .get_or_compute_with(
                &key,
                |prices| {
                    if prices.is_fallback() {
                        failure_ttl
                    } else {
                        market_ttl
                    }
                },
                || async move {
                    let outcome = self
                        .invoker
                        .invoke(provider.name(), "fetch", move || provider.fetch(query))
                        .await;
                    match outcome {
                        Ok(Invocation::Completed(records)) if records.is_empty() => {
                            serve_fallback(FallbackReason::NoRecords, "no records for filters")
                        }
                        Ok(Invocation::Completed(records)) => MarketPrices::live(records),
                        Ok(Invocation::Exhausted { message, .. }) => {
                            serve_fallback(FallbackReason::RateLimited, &message)
                        }
                        Err(KrishiError::Misconfigured { reason, .. }) => {
                            serve_fallback(FallbackReason::Unauthorized, &reason)
                        }
                        Err(e) => {
                            warn!(upstream = provider.name(), error = %e, "market price feed failed");
                            serve_fallback(FallbackReason::Unavailable, &e.to_string())
                        }
                    }
                },
            )
            .await
    }
}

fn serve_fallback(reason: FallbackReason, detail: &str) -> MarketPrices {
    metrics::counter!(telemetry::MARKET_FALLBACKS_TOTAL, "reason" => reason.as_str())
        .increment(1);
    info!(fallback_reason = reason.as_str(), detail, "serving fallback market prices");
    MarketPrices::fallback(reason)
}
