//! data.gov.in client for daily mandi (wholesale market) prices.
//!
//! See: <https://www.data.gov.in/resource/current-daily-price-various-commodities-various-markets-mandi>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::traits::MarketPriceProvider;
use super::{DEFAULT_UPSTREAM_TIMEOUT, http_client, record_request, retry_after_header};
use crate::types::{MarketQuery, PriceRecord};
use crate::{KrishiError, Result};

/// Default base URL for the data.gov.in API
pub const DEFAULT_BASE_URL: &str = "https://api.data.gov.in";

/// Daily commodity prices dataset.
pub const DEFAULT_RESOURCE_ID: &str = "9ef84268-d588-465a-a308-a864a43d0070";

const UPSTREAM: &str = "data.gov.in";

/// Client for a data.gov.in resource.
#[derive(Clone)]
pub struct DataGovClient {
    api_key: String,
    resource_id: String,
    http: Client,
    base_url: String,
}

impl DataGovClient {
    /// Create a client for the default price dataset.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_config(api_key, base_url, DEFAULT_UPSTREAM_TIMEOUT)
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            http: http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Query a different resource.
    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = resource_id.into();
        self
    }

    async fn fetch_inner(&self, query: &MarketQuery) -> Result<Vec<PriceRecord>> {
        let url = format!("{}/resource/{}", self.base_url, self.resource_id);

        let limit = query.limit.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("api-key", self.api_key.as_str()),
            ("format", "json"),
            ("limit", limit.as_str()),
            ("sort[arrival_date]", "desc"),
        ];
        if let Some(state) = &query.state {
            params.push(("filters[state]", state.as_str()));
        }
        if let Some(commodity) = &query.commodity {
            params.push(("filters[commodity]", commodity.as_str()));
        }

        let response = self.http.get(&url).query(&params).send().await?;

        self.handle_response_errors(&response)?;

        let body: RecordsResponse = response.json().await?;
        Ok(body.records.into_iter().map(RawRecord::into_record).collect())
    }

    /// Check response status and map to the error taxonomy.
    fn handle_response_errors(&self, response: &reqwest::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 | 403 => Err(KrishiError::Misconfigured {
                upstream: UPSTREAM,
                reason: format!("API key rejected ({status})"),
            }),
            429 => Err(KrishiError::RateLimited {
                retry_after: retry_after_header(response),
            }),
            _ => Err(KrishiError::Unavailable(format!(
                "data.gov.in error: {status}"
            ))),
        }
    }
}

#[async_trait]
impl MarketPriceProvider for DataGovClient {
    fn name(&self) -> &str {
        UPSTREAM
    }

    async fn fetch(&self, query: &MarketQuery) -> Result<Vec<PriceRecord>> {
        let result = self.fetch_inner(query).await;
        record_request(UPSTREAM, "fetch", &result);
        result
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<RawRecord>,
}

#[derive(Deserialize)]
struct RawRecord {
    commodity: Option<String>,
    state: Option<String>,
    market: Option<String>,
    modal_price: Option<serde_json::Value>,
    arrival_date: Option<String>,
}

impl RawRecord {
    fn into_record(self) -> PriceRecord {
        let price = match self.modal_price {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => "N/A".to_string(),
        };
        PriceRecord {
            commodity: self.commodity.unwrap_or_else(|| "Unknown".to_string()),
            state: self.state.unwrap_or_else(|| "Unknown".to_string()),
            market: self.market.unwrap_or_else(|| "Unknown".to_string()),
            price,
            date: self.arrival_date.unwrap_or_else(|| "N/A".to_string()),
        }
    }
}
