//! Memoization subsystem.
//!
//! [`MemoCache`] is a generic key → value store with a per-entry TTL and
//! manual invalidation. Every cached function in the crate goes through
//! [`MemoCache::get_or_compute`] (or the `_with` variant when the TTL depends
//! on the computed value, e.g. shorter TTLs for failures).
//!
//! # Architecture
//!
//! Entries live in moka's async cache, which shards its map and locks per
//! key, so unrelated lookups never serialize behind a global lock. Each
//! stored [`CacheEntry`] carries its own `expires_at`; a moka [`Expiry`]
//! policy turns that into the entry's lifetime, and reads re-check it so an
//! entry is never served past its deadline even before moka's housekeeping
//! runs.
//!
//! Concurrent misses for the same key are *not* collapsed into one compute
//! call. Upstream cost is moderate and concurrency is low, so a few
//! redundant in-flight computations are acceptable.
//!
//! Invalidation wins over in-flight computes: [`MemoCache::invalidate`]
//! bumps a cache-wide generation, and a compute that started under an older
//! generation returns its value to the caller without storing it.
//!
//! Failures are values too: callers that memoize a `Result` store errors
//! under a (usually shorter) TTL so a failing upstream is not hammered.

pub mod key;

pub use key::{CacheKey, canonical_json};

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use tracing::debug;

use crate::telemetry;

/// Configuration for the memoization caches.
///
/// ```rust
/// # use krishi::cache::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .weather_ttl(Duration::from_secs(300));
/// assert!(config.advice_ttl > config.weather_ttl);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries per cache. Default: 10,000.
    pub max_entries: u64,
    /// Current-weather TTL. Default: 10 minutes.
    pub weather_ttl: Duration,
    /// Forecast TTL. Default: 30 minutes.
    pub forecast_ttl: Duration,
    /// AI advice TTL. Longer than weather: advice is expensive and changes
    /// less meaningfully. Default: 1 hour.
    pub advice_ttl: Duration,
    /// AI news TTL (keyed by location). Default: 6 hours.
    pub news_ttl: Duration,
    /// Composed dashboard TTL (keyed by user). Default: 10 minutes.
    pub dashboard_ttl: Duration,
    /// Market price TTL (keyed by filters). Default: 1 hour.
    pub market_ttl: Duration,
    /// Crop recommendation TTL. Default: 24 hours.
    pub recommendation_ttl: Duration,
    /// TTL for memoized failures and exhausted retries. Default: 60 seconds.
    pub failure_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            weather_ttl: Duration::from_secs(600),
            forecast_ttl: Duration::from_secs(1_800),
            advice_ttl: Duration::from_secs(3_600),
            news_ttl: Duration::from_secs(6 * 3_600),
            dashboard_ttl: Duration::from_secs(600),
            market_ttl: Duration::from_secs(3_600),
            recommendation_ttl: Duration::from_secs(24 * 3_600),
            failure_ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of entries per cache.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the current-weather TTL.
    pub fn weather_ttl(mut self, ttl: Duration) -> Self {
        self.weather_ttl = ttl;
        self
    }

    /// Set the forecast TTL.
    pub fn forecast_ttl(mut self, ttl: Duration) -> Self {
        self.forecast_ttl = ttl;
        self
    }

    /// Set the advice TTL.
    pub fn advice_ttl(mut self, ttl: Duration) -> Self {
        self.advice_ttl = ttl;
        self
    }

    /// Set the news TTL.
    pub fn news_ttl(mut self, ttl: Duration) -> Self {
        self.news_ttl = ttl;
        self
    }

    /// Set the dashboard TTL.
    pub fn dashboard_ttl(mut self, ttl: Duration) -> Self {
        self.dashboard_ttl = ttl;
        self
    }

    /// Set the market price TTL.
    pub fn market_ttl(mut self, ttl: Duration) -> Self {
        self.market_ttl = ttl;
        self
    }

    /// Set the crop recommendation TTL.
    pub fn recommendation_ttl(mut self, ttl: Duration) -> Self {
        self.recommendation_ttl = ttl;
        self
    }

    /// Set the TTL used for memoized failures.
    pub fn failure_ttl(mut self, ttl: Duration) -> Self {
        self.failure_ttl = ttl;
        self
    }

    /// Pick the TTL for a memoized `Result`: `ok_ttl` for successes,
    /// [`failure_ttl`](Self::failure_ttl) for errors.
    pub fn ttl_for<T, E>(&self, result: &std::result::Result<T, E>, ok_ttl: Duration) -> Duration {
        if result.is_ok() {
            ok_ttl
        } else {
            self.failure_ttl
        }
    }
}

/// A memoized value and its deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// moka expiry policy reading each entry's own deadline.
struct EntryDeadline;

impl<V> Expiry<CacheKey, CacheEntry<V>> for EntryDeadline {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        entry: &CacheEntry<V>,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.expires_at.saturating_duration_since(created_at))
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        entry: &CacheEntry<V>,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.expires_at.saturating_duration_since(updated_at))
    }
}

/// Thread-safe memoization cache with per-entry TTL.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct MemoCache<V> {
    name: &'static str,
    entries: Cache<CacheKey, CacheEntry<V>>,
    generation: AtomicU64,
}

impl<V> MemoCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache. `name` labels metrics and logs.
    pub fn new(name: &'static str, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .name(name)
            .max_capacity(max_entries)
            .expire_after(EntryDeadline)
            .build();
        Self {
            name,
            entries,
            generation: AtomicU64::new(0),
        }
    }

    /// Cache name used in metrics and logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the live value for `key`, or run `compute`, store its output
    /// for `ttl` and return it.
    ///
    /// `compute` is never invoked while a live entry exists.
    pub async fn get_or_compute<F, Fut>(&self, key: &CacheKey, ttl: Duration, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        self.get_or_compute_with(key, |_| ttl, compute).await
    }

    /// Like [`get_or_compute`](Self::get_or_compute), with the TTL chosen
    /// from the computed value.
    pub async fn get_or_compute_with<F, Fut, T>(&self, key: &CacheKey, ttl_for: T, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
        T: FnOnce(&V) -> Duration,
    {
        if let Some(value) = self.get(key).await {
            return value;
        }

        let started = self.generation.load(Ordering::SeqCst);
        let value = compute().await;
        let ttl = ttl_for(&value);
        self.store_from(started, key, value.clone(), ttl).await;
        value
    }

    /// Fallible variant: only `Ok` values are stored, errors pass through
    /// uncached.
    pub async fn get_or_try_compute<F, Fut, T, E>(
        &self,
        key: &CacheKey,
        ttl_for: T,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
        T: FnOnce(&V) -> Duration,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let started = self.generation.load(Ordering::SeqCst);
        let value = compute().await?;
        let ttl = ttl_for(&value);
        self.store_from(started, key, value.clone(), ttl).await;
        Ok(value)
    }

    /// Store a value computed under generation `started`, unless an
    /// invalidation has happened since.
    ///
    /// The generation is checked again after the insert: an invalidation
    /// that slips in between check and insert removes the entry here, since
    /// its own removal may already have run.
    async fn store_from(&self, started: u64, key: &CacheKey, value: V, ttl: Duration) {
        if self.generation.load(Ordering::SeqCst) != started {
            debug!(cache = self.name, key = %key, "invalidated during compute, not stored");
            return;
        }
        self.entries.insert(key.clone(), CacheEntry::new(value, ttl)).await;
        if self.generation.load(Ordering::SeqCst) != started {
            self.entries.invalidate(key).await;
            debug!(cache = self.name, key = %key, "invalidated during compute, dropped");
        }
    }

    /// Look up a live entry. Emits hit/miss metrics.
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        match self.entries.get(key).await {
            Some(entry) if entry.is_live() => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "cache" => self.name).increment(1);
                debug!(cache = self.name, key = %key, "cache hit");
                Some(entry.value)
            }
            stale => {
                if stale.is_some() {
                    // Deadline passed before moka's housekeeping evicted it.
                    self.entries.invalidate(key).await;
                }
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "cache" => self.name)
                    .increment(1);
                debug!(cache = self.name, key = %key, "cache miss");
                None
            }
        }
    }

    /// Insert (or overwrite) a value that expires after `ttl`.
    pub async fn insert(&self, key: CacheKey, value: V, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(value, ttl)).await;
    }

    /// Remove an entry immediately, regardless of its TTL.
    ///
    /// Completes before returning: any later read for `key` misses, and a
    /// compute already in flight will not store its result.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate(key).await;
        metrics::counter!(telemetry::CACHE_INVALIDATIONS_TOTAL, "cache" => self.name)
            .increment(1);
        debug!(cache = self.name, key = %key, "cache entry invalidated");
    }

    /// Evict every entry.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.invalidate_all();
    }

    /// Run pending maintenance, evicting expired entries.
    pub async fn sweep(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Approximate number of stored entries (may include expired entries
    /// until the next [`sweep`](Self::sweep)).
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.weather_ttl, Duration::from_secs(600));
        assert!(config.advice_ttl > config.weather_ttl);
        assert!(config.failure_ttl < config.weather_ttl);
    }

    #[test]
    fn ttl_for_picks_failure_ttl_on_error() {
        let config = CacheConfig::new().failure_ttl(Duration::from_secs(5));
        let ok: std::result::Result<u8, ()> = Ok(1);
        let err: std::result::Result<u8, ()> = Err(());
        assert_eq!(config.ttl_for(&ok, Duration::from_secs(90)), Duration::from_secs(90));
        assert_eq!(config.ttl_for(&err, Duration::from_secs(90)), Duration::from_secs(5));
    }

    #[test]
    fn entry_liveness_follows_deadline() {
        let live = CacheEntry::new(1, Duration::from_secs(60));
        assert!(live.is_live());
        let dead = CacheEntry::new(1, Duration::ZERO);
        assert!(!dead.is_live());
    }
}
