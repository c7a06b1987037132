//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CATALOG_API_URL` - Catalog API base URL (default: <https://fakestoreapi.com>)
//! - `CATALOG_TIMEOUT_SECS` - HTTP request timeout (default: 10)
//! - `CATALOG_CACHE_TTL_SECS` - Catalog response cache TTL (default: 300)
//! - `CART_STORAGE_DIR` - Directory holding the durable cart slot (default: `.fakestore`)
//! - `STORE_CURRENCY` - ISO 4217 display currency (default: INR)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use fakestore_core::CurrencyCode;
use thiserror::Error;
use url::Url;

const DEFAULT_CATALOG_API_URL: &str = "https://fakestoreapi.com";
const DEFAULT_CATALOG_TIMEOUT_SECS: &str = "10";
const DEFAULT_CATALOG_CACHE_TTL_SECS: &str = "300";
const DEFAULT_CART_STORAGE_DIR: &str = ".fakestore";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Catalog API configuration
    pub catalog: CatalogConfig,
    /// Directory of the durable storage slot
    pub storage_dir: PathBuf,
    /// Currency used when displaying prices
    pub currency: CurrencyCode,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Catalog API configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL; endpoint paths are appended to it
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long catalog responses stay cached
    pub cache_ttl: Duration,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let catalog = CatalogConfig::from_env(&env)?;
        let storage_dir = PathBuf::from(
            env.get_or_default("CART_STORAGE_DIR", DEFAULT_CART_STORAGE_DIR),
        );
        let currency = env
            .get_or_default("STORE_CURRENCY", CurrencyCode::default().code())
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("STORE_CURRENCY".to_string(), e.to_string()))?;
        let sentry_dsn = env.get_optional("SENTRY_DSN");

        Ok(Self {
            catalog,
            storage_dir,
            currency,
            sentry_dsn,
        })
    }
}

impl CatalogConfig {
    fn from_env<F>(env: &Env<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = env.get_or_default("CATALOG_API_URL", DEFAULT_CATALOG_API_URL);
        let base_url = Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_API_URL".to_string(), e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "CATALOG_API_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            timeout: env.get_secs("CATALOG_TIMEOUT_SECS", DEFAULT_CATALOG_TIMEOUT_SECS)?,
            cache_ttl: env.get_secs("CATALOG_CACHE_TTL_SECS", DEFAULT_CATALOG_CACHE_TTL_SECS)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Environment lookup wrapper.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable. Empty values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a whole number of seconds.
    fn get_secs(&self, key: &str, default: &str) -> Result<Duration, ConfigError> {
        self.get_or_default(key, default)
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}
