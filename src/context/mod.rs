//! Application context.
//!
//! One [`AppContext`] is built at startup (see [`Krishi::builder`]) and
//! shared by reference or `Arc` with every handler. Upstreams without
//! credentials are absent (`None`) rather than failing per request.

mod builder;

pub use builder::{Krishi, KrishiBuilder};

use std::sync::Arc;

use crate::agronomy::CropTable;
use crate::handler::{DashboardHandler, WeatherHandler};
use crate::pipeline::AggregationPipeline;

/// Which upstreams are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct UpstreamStatus {
    pub weather: bool,
    pub advisory: bool,
    pub market: bool,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppContext {
    pipeline: Arc<AggregationPipeline>,
}

impl AppContext {
    pub fn new(pipeline: AggregationPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// The aggregation pipeline.
    pub fn pipeline(&self) -> &Arc<AggregationPipeline> {
        &self.pipeline
    }

    pub fn crops(&self) -> &CropTable {
        self.pipeline.crops()
    }

    pub fn upstream_status(&self) -> UpstreamStatus {
        let upstreams = self.pipeline.upstreams();
        UpstreamStatus {
            weather: upstreams.weather.is_some(),
            advisory: upstreams.advisory.is_some(),
            market: upstreams.market.is_some(),
        }
    }

    /// Profile-update hook: drop the cached dashboard for `user_id`.
    pub async fn invalidate_dashboard(&self, user_id: &str) {
        self.pipeline.invalidate_dashboard(user_id).await;
    }

    /// Handler for `city → WeatherReport`.
    pub fn weather_handler(&self) -> WeatherHandler {
        WeatherHandler::new(self.pipeline.clone())
    }

    /// Handler for `(user, ()) → DashboardView`; wrap with
    /// [`with_auth`](crate::handler::with_auth) to serve credentials.
    pub fn dashboard_handler(&self) -> DashboardHandler {
        DashboardHandler::new(self.pipeline.clone())
    }
}
