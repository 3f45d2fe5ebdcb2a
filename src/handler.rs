//! Explicit handler composition.
//!
//! A request handler is a value implementing [`Handler`]. Cross-cutting
//! concerns wrap it:
//!
//! - [`with_auth`] resolves a credential into a [`UserContext`] before the
//!   inner handler runs, rejecting missing or invalid credentials
//! - [`with_cache`] memoizes successful outputs under a key computed from the
//!   request
//!
//! Wrappers are ordinary structs composed at registration time:
//!
//! ```rust,ignore
//! let dashboard = with_auth(ctx.dashboard_handler(), auth);
//! let weather = with_cache(ctx.weather_handler(), cache, ttl, |city: &String| {
//!     CacheKey::new("weather_report", &[city])
//! });
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cache::{CacheKey, MemoCache};
use crate::pipeline::AggregationPipeline;
use crate::types::{DashboardView, UserContext, WeatherReport};
use crate::{KrishiError, Result};

/// An async request handler.
#[async_trait]
pub trait Handler<Req>: Send + Sync
where
    Req: Send + 'static,
{
    type Output: Send;

    async fn call(&self, request: Req) -> Result<Self::Output>;
}

// ============================================================================
// Auth guard
// ============================================================================

/// Resolves credentials into users. Implemented by the auth collaborator.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a credential. Invalid or expired credentials should yield
    /// [`KrishiError::Unauthorized`].
    async fn authenticate(&self, credential: &str) -> Result<UserContext>;
}

/// A request with the caller's credential, if any.
#[derive(Debug, Clone)]
pub struct Authenticated<Req> {
    pub credential: Option<String>,
    pub request: Req,
}

impl<Req> Authenticated<Req> {
    pub fn new(credential: impl Into<String>, request: Req) -> Self {
        Self {
            credential: Some(credential.into()),
            request,
        }
    }

    pub fn anonymous(request: Req) -> Self {
        Self {
            credential: None,
            request,
        }
    }
}

/// Wraps a handler of `(UserContext, Req)` so it accepts
/// [`Authenticated<Req>`].
pub struct AuthGuard<H, A> {
    inner: H,
    authenticator: A,
}

/// Require a valid credential before `handler` runs.
pub fn with_auth<H, A>(handler: H, authenticator: A) -> AuthGuard<H, A> {
    AuthGuard {
        inner: handler,
        authenticator,
    }
}

#[async_trait]
impl<Req, H, A> Handler<Authenticated<Req>> for AuthGuard<H, A>
where
    Req: Send + 'static,
    H: Handler<(UserContext, Req)>,
    A: Authenticator,
{
    type Output = H::Output;

    async fn call(&self, request: Authenticated<Req>) -> Result<Self::Output> {
        let credential = request
            .credential
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| KrishiError::Unauthorized("token is missing".to_string()))?;
        let user = self.authenticator.authenticate(credential).await?;
        self.inner.call((user, request.request)).await
    }
}

// ============================================================================
// Cache layer
// ============================================================================

/// Memoizes the successful outputs of an inner handler.
pub struct CacheLayer<H, O, K> {
    inner: H,
    cache: Arc<MemoCache<O>>,
    ttl: Duration,
    key_fn: K,
}

/// Cache `handler`'s successful outputs for `ttl`, keyed by `key_fn`.
/// Errors are returned uncached.
pub fn with_cache<H, O, K>(
    handler: H,
    cache: Arc<MemoCache<O>>,
    ttl: Duration,
    key_fn: K,
) -> CacheLayer<H, O, K> {
    CacheLayer {
        inner: handler,
        cache,
        ttl,
        key_fn,
    }
}

#[async_trait]
impl<Req, H, O, K> Handler<Req> for CacheLayer<H, O, K>
where
    Req: Send + 'static,
    H: Handler<Req, Output = O>,
    O: Clone + Send + Sync + 'static,
    K: Fn(&Req) -> CacheKey + Send + Sync,
{
    type Output = O;

    async fn call(&self, request: Req) -> Result<O> {
        let key = (self.key_fn)(&request);
        let ttl = self.ttl;
        self.cache
            .get_or_try_compute(&key, |_| ttl, || self.inner.call(request))
            .await
    }
}

// ============================================================================
// Ready handlers
// ============================================================================

/// `city → WeatherReport`.
#[derive(Clone)]
pub struct WeatherHandler {
    pipeline: Arc<AggregationPipeline>,
}

impl WeatherHandler {
    pub fn new(pipeline: Arc<AggregationPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Handler<String> for WeatherHandler {
    type Output = WeatherReport;

    async fn call(&self, city: String) -> Result<WeatherReport> {
        self.pipeline.weather(&city).await
    }
}

/// `(user, ()) → DashboardView`. Wrap with [`with_auth`].
#[derive(Clone)]
pub struct DashboardHandler {
    pipeline: Arc<AggregationPipeline>,
}

impl DashboardHandler {
    pub fn new(pipeline: Arc<AggregationPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl Handler<(UserContext, ())> for DashboardHandler {
    type Output = DashboardView;

    async fn call(&self, request: (UserContext, ())) -> Result<DashboardView> {
        let (user, ()) = request;
        self.pipeline.dashboard(&user).await
    }
}
