//! Current-weather types.

use serde::{Deserialize, Serialize};

/// Conversion factor from metres per second to kilometres per hour.
pub const MS_TO_KMH: f64 = 3.6;

/// Observed conditions for a city at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Air temperature in °C.
    pub temperature: f64,
    /// Free-text description, e.g. "scattered clouds".
    pub condition: String,
    /// Relative humidity in percent.
    pub humidity: f64,
    pub wind_speed_kmh: f64,
    /// City name as resolved by the upstream.
    pub city_name: String,
    pub icon: String,
}

/// Current weather, or the reason it could not be obtained.
///
/// Used where weather is an optional decoration of another result (the
/// fertility report): a failed lookup never fails the enclosing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeatherSnapshot {
    Available(CurrentWeather),
    Unavailable { reason: String },
}

impl WeatherSnapshot {
    /// Whether weather data is present.
    pub fn is_available(&self) -> bool {
        matches!(self, WeatherSnapshot::Available(_))
    }

    /// Borrow the weather, if present.
    pub fn weather(&self) -> Option<&CurrentWeather> {
        match self {
            WeatherSnapshot::Available(weather) => Some(weather),
            WeatherSnapshot::Unavailable { .. } => None,
        }
    }
}

impl From<CurrentWeather> for WeatherSnapshot {
    fn from(weather: CurrentWeather) -> Self {
        WeatherSnapshot::Available(weather)
    }
}
