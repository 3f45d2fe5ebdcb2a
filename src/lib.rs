//! Krishi - caching aggregation layer and agronomy engine for farmers
//!
//! This crate sits between client requests and three unreliable upstreams
//! (a weather provider, a generative-AI advisory service and a government
//! market-price feed). It memoizes upstream results, retries rate-limited
//! calls with backoff, composes weather + forecast + advice into one report,
//! and falls back to deterministic data when an upstream is unavailable.
//! The agronomy engine (fertility classification, fertilizer gaps) is pure
//! and needs no upstream at all.
//!
//! # Weather Example
//!
//! ```rust,no_run
//! use krishi::Krishi;
//!
//! #[tokio::main]
//! async fn main() -> krishi::Result<()> {
//!     let ctx = Krishi::builder()
//!         .openweather("owm-your-key")
//!         .gemini("gemini-your-key")
//!         .build()?;
//!
//!     let report = ctx.pipeline().weather("Pune").await?;
//!     if let Some(advice) = &report.advice {
//!         println!("{advice}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Fertilizer Example
//!
//! ```rust
//! let plan = krishi::compute_fertilizer_gap(0.0, 0.0, 0.0, "rice").unwrap();
//! assert_eq!(plan.mop_kg, 100.0);
//! ```

pub mod agronomy;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use context::{AppContext, Krishi, KrishiBuilder, UpstreamStatus};
pub use error::{KrishiError, Result};
pub use pipeline::{AggregationPipeline, PipelineSettings, Upstreams};
pub use providers::{Invocation, RetryConfig, RetryingInvoker};

pub use agronomy::{
    CropTable, FertilityAssessment, FertilizerPlan, Level, NutrientTarget, SoilReading,
    classify_fertility, compute_fertilizer_gap,
};
pub use cache::{CacheConfig, CacheKey, MemoCache};

// Re-export all types
pub use types::{
    CropRecommendation, CurrentWeather, DashboardView, FallbackReason, FertilityReport,
    FieldConditions, ForecastDay, ForecastSet, InlineImage, MarketPrices, MarketQuery,
    PestDiagnosis, PipelineStage, PriceRecord, PriceSource, Prompt, ReportStatus, UserContext,
    WeatherReport, WeatherSnapshot,
};

/// Crate version.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
