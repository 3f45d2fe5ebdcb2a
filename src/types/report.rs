//! Composed results returned by the aggregation pipeline.

use serde::Serialize;

use super::forecast::ForecastSet;
use super::weather::{CurrentWeather, WeatherSnapshot};
use crate::agronomy::FertilityAssessment;

/// Progress of a weather request through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    WeatherFetched,
    ForecastFetched,
    AdviceReady,
    Composed,
}

/// Terminal state of a weather request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportStatus {
    /// Every sub-result is present.
    Composed,
    /// Stopped after `reached`; later sub-results are missing.
    Degraded {
        reached: PipelineStage,
        reason: String,
    },
}

/// Current weather, forecast and advice for a city.
///
/// A degraded report carries whatever sub-results succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub current: Option<CurrentWeather>,
    pub forecast: Option<ForecastSet>,
    pub advice: Option<String>,
    #[serde(flatten)]
    pub status: ReportStatus,
}

impl WeatherReport {
    pub(crate) fn degraded(
        city: &str,
        reached: PipelineStage,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            city: city.to_string(),
            current: None,
            forecast: None,
            advice: None,
            status: ReportStatus::Degraded {
                reached,
                reason: reason.into(),
            },
        }
    }

    pub fn is_composed(&self) -> bool {
        self.status == ReportStatus::Composed
    }

    /// Last stage reached.
    pub fn stage(&self) -> PipelineStage {
        match &self.status {
            ReportStatus::Composed => PipelineStage::Composed,
            ReportStatus::Degraded { reached, .. } => *reached,
        }
    }
}

/// Personalized dashboard for a signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub user_id: String,
    pub full_name: String,
    pub location: String,
    pub weather: Option<WeatherReport>,
    /// AI news headlines for the location.
    pub news: Option<String>,
    /// Explanations for missing or degraded sections.
    pub notices: Vec<String>,
}

impl DashboardView {
    /// Whether every section is present and complete.
    pub fn is_complete(&self) -> bool {
        self.notices.is_empty()
    }
}

/// Fertility classification decorated with local weather.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FertilityReport {
    pub location: String,
    pub weather: WeatherSnapshot,
    pub assessment: FertilityAssessment,
}
