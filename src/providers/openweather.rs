//! OpenWeatherMap client for current conditions and 5-day forecasts.
//!
//! See: <https://openweathermap.org/current> and
//! <https://openweathermap.org/forecast5>

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::traits::WeatherProvider;
use super::{DEFAULT_UPSTREAM_TIMEOUT, http_client, record_request, retry_after_header};
use crate::types::weather::MS_TO_KMH;
use crate::types::{CurrentWeather, ForecastSample, ForecastSet};
use crate::{KrishiError, Result};

/// Default base URL for the OpenWeatherMap API
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const UPSTREAM: &str = "openweather";

/// Client for the OpenWeatherMap API (metric units).
#[derive(Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenWeatherClient {
    /// Create a client with the given API key.
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
            http: http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, endpoint: &str, city: &str) -> Result<Value> {
        let url = format!("{}/data/2.5/{}", self.base_url, endpoint);
        let response = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await?;

        self.handle_response_errors(&response, city)?;

        let body: Value = response.json().await?;
        check_cod(&body, city)?;
        Ok(body)
    }

    /// Check response status and map to the error taxonomy.
    fn handle_response_errors(&self, response: &reqwest::Response, city: &str) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 | 403 => Err(KrishiError::Misconfigured {
                upstream: UPSTREAM,
                reason: format!("API key rejected ({status})"),
            }),
            404 => Err(KrishiError::NotFound(format!("city not found: {city}"))),
            429 => Err(KrishiError::RateLimited {
                retry_after: retry_after_header(response),
            }),
            _ => Err(KrishiError::Unavailable(format!(
                "OpenWeatherMap error: {status}"
            ))),
        }
    }
}

/// The payload's own `cod` field (number or string) must be 200.
fn check_cod(body: &Value, city: &str) -> Result<()> {
    let cod = match body.get("cod") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse::<u64>().ok(),
        _ => None,
    };
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    match cod {
        Some(200) => Ok(()),
        Some(404) => Err(KrishiError::NotFound(format!("{message}: {city}"))),
        Some(429) => Err(KrishiError::RateLimited { retry_after: None }),
        Some(401) => Err(KrishiError::Misconfigured {
            upstream: UPSTREAM,
            reason: message.to_string(),
        }),
        Some(code) => Err(KrishiError::Unavailable(format!(
            "OpenWeatherMap returned cod {code}: {message}"
        ))),
        None => Err(KrishiError::Unavailable(
            "malformed response: missing cod".to_string(),
        )),
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    fn name(&self) -> &str {
        UPSTREAM
    }

    async fn current(&self, city: &str) -> Result<CurrentWeather> {
        let result = async {
            let body = self.get("weather", city).await?;
            let parsed: CurrentResponse = serde_json::from_value(body)?;
            parsed.into_weather()
        }
        .await;
        record_request(UPSTREAM, "current", &result);
        result
    }

    async fn forecast(&self, city: &str) -> Result<ForecastSet> {
        let result = async {
            let body = self.get("forecast", city).await?;
            let parsed: ForecastResponse = serde_json::from_value(body)?;
            parsed.into_forecast()
        }
        .await;
        record_request(UPSTREAM, "forecast", &result);
        result
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Deserialize)]
struct CurrentResponse {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    #[serde(default)]
    wind: WindBlock,
    name: String,
}

#[derive(Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct ConditionBlock {
    description: String,
    icon: String,
}

#[derive(Deserialize, Default)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

impl CurrentResponse {
    fn into_weather(self) -> Result<CurrentWeather> {
        let condition = self.weather.into_iter().next().ok_or_else(|| {
            KrishiError::Unavailable("malformed response: no weather conditions".to_string())
        })?;
        Ok(CurrentWeather {
            temperature: self.main.temp,
            condition: condition.description,
            humidity: self.main.humidity,
            wind_speed_kmh: self.wind.speed * MS_TO_KMH,
            city_name: self.name,
            icon: condition.icon,
        })
    }
}

#[derive(Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
    #[serde(default)]
    city: Option<CityBlock>,
}

#[derive(Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: RangeBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Deserialize)]
struct RangeBlock {
    temp_min: f64,
    temp_max: f64,
}

#[derive(Deserialize)]
struct CityBlock {
    /// Shift in seconds from UTC.
    #[serde(default)]
    timezone: i32,
}

impl ForecastResponse {
    fn into_forecast(self) -> Result<ForecastSet> {
        let offset_secs = self.city.map(|c| c.timezone).unwrap_or(0);
        let offset = FixedOffset::east_opt(offset_secs)
            .or_else(|| FixedOffset::east_opt(0))
            .ok_or_else(|| KrishiError::Unavailable("invalid timezone offset".to_string()))?;

        let mut samples = Vec::with_capacity(self.list.len());
        for entry in self.list {
            let timestamp = DateTime::from_timestamp(entry.dt, 0).ok_or_else(|| {
                KrishiError::Unavailable(format!("malformed response: bad timestamp {}", entry.dt))
            })?;
            let Some(condition) = entry.weather.into_iter().next() else {
                continue;
            };
            samples.push(ForecastSample {
                timestamp,
                temp_min: entry.main.temp_min,
                temp_max: entry.main.temp_max,
                condition: condition.description,
                icon: condition.icon,
            });
        }

        if samples.is_empty() {
            return Err(KrishiError::Unavailable(
                "forecast response contained no samples".to_string(),
            ));
        }
        Ok(ForecastSet::from_samples(&samples, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cod_accepts_number_and_string() {
        assert!(check_cod(&json!({"cod": 200}), "x").is_ok());
        assert!(check_cod(&json!({"cod": "200"}), "x").is_ok());
    }

    #[test]
    fn cod_404_is_not_found() {
        let err = check_cod(&json!({"cod": "404", "message": "city not found"}), "Nowhereville")
            .unwrap_err();
        assert!(matches!(err, KrishiError::NotFound(m) if m.contains("Nowhereville")));
    }

    #[test]
    fn cod_missing_is_unavailable() {
        assert!(matches!(
            check_cod(&json!({}), "x"),
            Err(KrishiError::Unavailable(_))
        ));
    }

    #[test]
    fn current_converts_wind_to_kmh() {
        let parsed: CurrentResponse = serde_json::from_value(json!({
            "main": {"temp": 30.0, "humidity": 55},
            "weather": [{"description": "haze", "icon": "50d"}],
            "wind": {"speed": 5.0},
            "name": "Pune"
        }))
        .unwrap();
        let weather = parsed.into_weather().unwrap();
        assert!((weather.wind_speed_kmh - 18.0).abs() < 1e-9);
        assert_eq!(weather.city_name, "Pune");
    }
}
