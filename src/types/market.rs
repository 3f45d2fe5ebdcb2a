//! Market price types and the static fallback dataset.

use serde::{Deserialize, Serialize};

/// Default number of records requested from the price feed.
pub const DEFAULT_MARKET_LIMIT: u32 = 100;

/// One commodity price observation at a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub commodity: String,
    pub state: String,
    pub market: String,
    /// Modal price per quintal, as reported (kept as text; the feed is not
    /// consistently numeric).
    pub price: String,
    /// Arrival date, as reported.
    pub date: String,
}

/// Optional filters for a market price lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarketQuery {
    pub state: Option<String>,
    pub commodity: Option<String>,
    pub limit: u32,
}

impl Default for MarketQuery {
    fn default() -> Self {
        Self {
            state: None,
            commodity: None,
            limit: DEFAULT_MARKET_LIMIT,
        }
    }
}

impl MarketQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by state. Blank values are ignored.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = non_blank(state.into());
        self
    }

    /// Filter by commodity. Blank values are ignored.
    pub fn commodity(mut self, commodity: impl Into<String>) -> Self {
        self.commodity = non_blank(commodity.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Why the fallback dataset was served instead of live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// No API key configured.
    NotConfigured,
    /// The feed rejected the API key (401/403).
    Unauthorized,
    /// Rate-limited through every retry.
    RateLimited,
    /// The feed returned zero records for the filters.
    NoRecords,
    /// Network failure, timeout or malformed response.
    Unavailable,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::NotConfigured => "not_configured",
            FallbackReason::Unauthorized => "unauthorized",
            FallbackReason::RateLimited => "rate_limited",
            FallbackReason::NoRecords => "no_records",
            FallbackReason::Unavailable => "unavailable",
        }
    }
}

/// Where a [`MarketPrices`] result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    Live,
    Fallback { reason: FallbackReason },
}

/// Market prices, live or from the fallback dataset. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPrices {
    pub records: Vec<PriceRecord>,
    pub source: PriceSource,
}

impl MarketPrices {
    /// Live records from the feed.
    pub fn live(records: Vec<PriceRecord>) -> Self {
        Self {
            records,
            source: PriceSource::Live,
        }
    }

    /// The static fallback dataset.
    pub fn fallback(reason: FallbackReason) -> Self {
        Self {
            records: fallback_records(),
            source: PriceSource::Fallback { reason },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, PriceSource::Fallback { .. })
    }
}

/// Representative prices shown when live data is unavailable.
pub fn fallback_records() -> Vec<PriceRecord> {
    [
        ("Wheat", "Punjab", "Ludhiana (Mock Data)", "2250"),
        ("Paddy(Dhan)(Common)", "Haryana", "Karnal (Mock Data)", "3100"),
        ("Cotton", "Gujarat", "Rajkot (Mock Data)", "7500"),
        ("Mustard", "Rajasthan", "Jaipur (Mock Data)", "5800"),
    ]
    .into_iter()
    .map(|(commodity, state, market, price)| PriceRecord {
        commodity: commodity.to_string(),
        state: state.to_string(),
        market: market.to_string(),
        price: price.to_string(),
        date: "2025-10-30".to_string(),
    })
    .collect()
}
