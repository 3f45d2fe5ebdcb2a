//! Core value types for krishi

pub mod advisory;
pub mod forecast;
pub mod market;
pub mod report;
pub mod user;
pub mod weather;

pub use advisory::{CropRecommendation, FieldConditions, InlineImage, PestDiagnosis, Prompt};
pub use forecast::{ForecastDay, ForecastSample, ForecastSet, MAX_FORECAST_DAYS};
pub use market::{
    FallbackReason, MarketPrices, MarketQuery, PriceRecord, PriceSource, fallback_records,
};
pub use report::{
    DashboardView, FertilityReport, PipelineStage, ReportStatus, WeatherReport,
};
pub use user::UserContext;
pub use weather::{CurrentWeather, WeatherSnapshot};
