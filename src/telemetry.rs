//! Telemetry metric name constants.
//!
//! Centralised metric names for krishi operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `krishi_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `cache`: memoization cache name (e.g. "weather", "advice", "dashboard")
//! - `upstream`: upstream name (e.g. "openweather", "gemini", "data.gov.in")
//! - `operation`: call made against the upstream (e.g. "current", "generate")
//! - `status`: "ok" or "error"

/// Total memoization cache hits.
///
/// Labels: `cache`.
pub const CACHE_HITS_TOTAL: &str = "krishi_cache_hits_total";

/// Total memoization cache misses (each miss runs the compute function).
///
/// Labels: `cache`.
pub const CACHE_MISSES_TOTAL: &str = "krishi_cache_misses_total";

/// Total explicit invalidations.
///
/// Labels: `cache`.
pub const CACHE_INVALIDATIONS_TOTAL: &str = "krishi_cache_invalidations_total";

/// Total upstream calls issued by the adapters.
///
/// Labels: `upstream`, `operation`, `status` ("ok" | "error").
pub const UPSTREAM_REQUESTS_TOTAL: &str = "krishi_upstream_requests_total";

/// Total retry attempts after a rate-limit response (not counting the first call).
///
/// Labels: `upstream`, `operation`.
pub const RETRIES_TOTAL: &str = "krishi_retries_total";

/// Total invocations that gave up after exhausting every attempt.
///
/// Labels: `upstream`, `operation`.
pub const RETRY_EXHAUSTED_TOTAL: &str = "krishi_retry_exhausted_total";

/// Total market-price responses served from the static fallback dataset.
///
/// Labels: `reason`.
pub const MARKET_FALLBACKS_TOTAL: &str = "krishi_market_fallbacks_total";
