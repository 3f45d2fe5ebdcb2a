//! Personalized dashboard: weather report plus AI news for the user's
//! default location, cached per user.
//!
//! The composed view is cached under the user's id. Profile changes must go
//! through [`AggregationPipeline::invalidate_dashboard`] so the next read
//! recomputes against the new location.

use tracing::{debug, info};

use super::{AggregationPipeline, advisor, advisory_upstream, required};
use crate::cache::CacheKey;
use crate::providers::Invocation;
use crate::types::{DashboardView, ReportStatus, UserContext};
use crate::{KrishiError, Result};

fn dashboard_key(user_id: &str) -> CacheKey {
    CacheKey::new("dashboard", &[user_id])
}

impl AggregationPipeline {
    /// Dashboard for a signed-in user.
    ///
    /// Fails with `Validation` when the user has no default location. A
    /// missing weather or news section is reported in
    /// [`DashboardView::notices`]; incomplete views are cached only for the
    /// failure TTL.
    pub async fn dashboard(&self, user: &UserContext) -> Result<DashboardView> {
        let user_id = required(&user.user_id, "user id")?;
        let location = user
            .location()
            .ok_or_else(|| KrishiError::Validation("User location not set.".to_string()))?;

        let dashboard_ttl = self.cache_config.dashboard_ttl;
        let failure_ttl = self.cache_config.failure_ttl;
        self.dashboard_cache
            .get_or_try_compute(
                &dashboard_key(user_id),
                |view| {
                    if view.is_complete() {
                        dashboard_ttl
                    } else {
                        failure_ttl
                    }
                },
                || self.with_deadline(self.compose_dashboard(user, location)),
            )
            .await
    }

    async fn compose_dashboard(&self, user: &UserContext, location: &str) -> Result<DashboardView> {
        let (weather, news) = tokio::join!(self.compose_weather(location), self.news(location));

        let mut notices = Vec::new();
        let weather = match weather {
            Ok(report) => {
                if let ReportStatus::Degraded { reason, .. } = &report.status {
                    notices.push(format!("weather: {reason}"));
                }
                Some(report)
            }
            Err(e) => {
                notices.push(format!("weather: {e}"));
                None
            }
        };
        let news = match news {
            Ok(Invocation::Completed(headlines)) => Some(headlines),
            Ok(Invocation::Exhausted { message, .. }) => {
                notices.push(format!("news: {message}"));
                None
            }
            Err(e) => {
                notices.push(format!("news: {e}"));
                None
            }
        };

        debug!(user_id = %user.user_id, location, notices = notices.len(), "dashboard composed");
        Ok(DashboardView {
            user_id: user.user_id.clone(),
            full_name: user.full_name.clone(),
            location: location.to_string(),
            weather,
            news,
            notices,
        })
    }

    /// AI news headlines for `location`, cached by location alone.
    pub async fn news(&self, location: &str) -> Result<Invocation<String>> {
        let location = required(location, "location")?;
        let provider = advisory_upstream(&self.upstreams)?;
        let key = CacheKey::new("news", &[location]);
        let prompt = advisor::news_prompt(location);
        let prompt = &prompt;
        self.cached_invoke(
            &self.news_cache,
            &key,
            self.cache_config.news_ttl,
            provider.name(),
            "news",
            move || provider.generate(prompt),
        )
        .await
    }

    /// Drop the cached dashboard for `user_id`.
    ///
    /// Call after a successful profile (location or name) update. Completes
    /// before returning, so the next [`dashboard`](Self::dashboard) read for
    /// this user recomputes.
    pub async fn invalidate_dashboard(&self, user_id: &str) {
        self.dashboard_cache.invalidate(&dashboard_key(user_id)).await;
        info!(user_id, "dashboard invalidated");
    }
}
