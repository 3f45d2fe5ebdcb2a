//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.krishi/config.toml` (user)
//! 3. `/etc/krishi/config.toml` (system)
//! 4. built-in defaults
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.krishi/secrets.toml` (user, must be 0600)
//! 2. `/etc/krishi/secrets.toml` (system, must be 0600)
//!
//! Each API key falls back to an environment variable when absent from the
//! secrets file.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::agronomy::NutrientTarget;
use crate::cache::CacheConfig;
use crate::providers::{DEFAULT_UPSTREAM_TIMEOUT, RetryConfig};
use crate::{KrishiError, Result};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstreams: UpstreamsConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    /// Extra or overriding crop nutrient targets, keyed by crop name.
    #[serde(default)]
    pub crops: BTreeMap<String, NutrientTarget>,
}

/// Upstream endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamsConfig {
    #[serde(default)]
    pub weather: UpstreamConfig,
    #[serde(default)]
    pub advisory: AdvisoryConfig,
    #[serde(default)]
    pub market: MarketConfig,
}

/// Base URL and timeout shared by every upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Override the upstream base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT.as_secs()
}

/// Generative advisory upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvisoryConfig {
    #[serde(flatten)]
    pub upstream: UpstreamConfig,
    /// Model name (default: gemini-2.0-flash).
    #[serde(default)]
    pub model: Option<String>,
}

/// Market price upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketConfig {
    #[serde(flatten)]
    pub upstream: UpstreamConfig,
    /// Dataset resource id.
    #[serde(default)]
    pub resource_id: Option<String>,
}

/// Cache sizing and TTLs. Unset values keep the [`CacheConfig`] defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSection {
    pub max_entries: Option<u64>,
    pub weather_ttl_secs: Option<u64>,
    pub forecast_ttl_secs: Option<u64>,
    pub advice_ttl_secs: Option<u64>,
    pub news_ttl_secs: Option<u64>,
    pub dashboard_ttl_secs: Option<u64>,
    pub market_ttl_secs: Option<u64>,
    pub recommendation_ttl_secs: Option<u64>,
    pub failure_ttl_secs: Option<u64>,
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::default();
        let secs = Duration::from_secs;
        if let Some(n) = self.max_entries {
            config.max_entries = n;
        }
        if let Some(s) = self.weather_ttl_secs {
            config.weather_ttl = secs(s);
        }
        if let Some(s) = self.forecast_ttl_secs {
            config.forecast_ttl = secs(s);
        }
        if let Some(s) = self.advice_ttl_secs {
            config.advice_ttl = secs(s);
        }
        if let Some(s) = self.news_ttl_secs {
            config.news_ttl = secs(s);
        }
        if let Some(s) = self.dashboard_ttl_secs {
            config.dashboard_ttl = secs(s);
        }
        if let Some(s) = self.market_ttl_secs {
            config.market_ttl = secs(s);
        }
        if let Some(s) = self.recommendation_ttl_secs {
            config.recommendation_ttl = secs(s);
        }
        if let Some(s) = self.failure_ttl_secs {
            config.failure_ttl = secs(s);
        }
        config
    }
}

/// Rate-limit retry policy. Unset values keep the [`RetryConfig`] defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub max_delay_secs: Option<u64>,
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        let mut config = RetryConfig::default();
        if let Some(n) = self.max_retries {
            config = config.max_retries(n);
        }
        if let Some(ms) = self.base_delay_ms {
            config = config.base_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.jitter_ms {
            config = config.jitter(Duration::from_millis(ms));
        }
        if let Some(s) = self.max_delay_secs {
            config = config.max_delay(Duration::from_secs(s));
        }
        config
    }
}

/// Request-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineSection {
    /// Overall deadline for a weather or dashboard request, in seconds.
    /// Unset means no deadline beyond the adapter timeouts and retry budget.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl PipelineSection {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Secrets configuration (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub weather: Option<ApiKeySecret>,
    #[serde(default)]
    pub gemini: Option<ApiKeySecret>,
    #[serde(default)]
    pub data_gov: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// Upstream name → environment variable name mapping.
const UPSTREAM_ENV_VARS: &[(&str, &str)] = &[
    ("weather", "WEATHER_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
    ("data_gov", "DATA_GOV_API_KEY"),
];

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist. Without one, a missing file means
    /// built-in defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            KrishiError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            KrishiError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(KrishiError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".krishi").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/krishi/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (keys may come from env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".krishi").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/krishi/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a specific secrets file, enforcing permissions.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            KrishiError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            KrishiError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            KrishiError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(KrishiError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for an upstream (`weather`, `gemini`, `data_gov`), falling
    /// back to the corresponding environment variable.
    pub fn api_key(&self, upstream: &str) -> Option<String> {
        let from_file = match upstream {
            "weather" => self.weather.as_ref(),
            "gemini" => self.gemini.as_ref(),
            "data_gov" => self.data_gov.as_ref(),
            _ => None,
        }
        .map(|s| s.api_key.trim().to_string())
        .filter(|k| !k.is_empty());

        from_file.or_else(|| {
            UPSTREAM_ENV_VARS
                .iter()
                .find(|(name, _)| *name == upstream)
                .and_then(|(_, env_var)| std::env::var(env_var).ok())
                .filter(|k| !k.trim().is_empty())
        })
    }
}
