//! Catalog API client.
//!
//! # Architecture
//!
//! - Read-only: products, single products, categories and title search
//! - Plain JSON over `reqwest`; the catalog is the source of truth
//! - In-memory caching via `moka` (TTL from [`CatalogConfig`], 5 minutes by default)
//! - No retries; failures surface as [`CatalogError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use fakestore_storefront::catalog::CatalogClient;
//!
//! let catalog = CatalogClient::new(&config.catalog)?;
//!
//! for category in catalog.categories().await? {
//!     let products = catalog.products_in_category(&category).await?;
//! }
//!
//! let matches = catalog.search("backpack").await?;
//! ```

mod cache;

use std::sync::Arc;

use fakestore_core::{Product, ProductId};
use moka::future::Cache;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::CatalogConfig;

use cache::{CacheKey, CacheValue};

const MAX_CACHED_RESPONSES: u64 = 1000;
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Errors that can occur when talking to the catalog API.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the catalog.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Non-success status other than 404 and 429.
    #[error("Catalog returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The configured base URL cannot have paths appended.
    #[error("Invalid catalog base URL: {0}")]
    InvalidBaseUrl(String),
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the product catalog.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cached", &self.inner.cache.is_some())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// A zero `cache_ttl` disables caching.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot take path segments or the HTTP
    /// client cannot be built.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        if config.base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidBaseUrl(config.base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("fakestore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = (!config.cache_ttl.is_zero()).then(|| {
            Cache::<CacheKey, CacheValue>::builder()
                .max_capacity(MAX_CACHED_RESPONSES)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(CatalogClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Build the URL for an endpoint below the base URL.
    ///
    /// Segments are percent-encoded, so category names containing spaces or
    /// slashes stay a single path segment.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET `url` and return the body of a successful response.
    async fn fetch(&self, url: Url) -> Result<String, CatalogError> {
        debug!(url = %url, "Fetching from catalog");

        let response = self.inner.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(url.path().to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CatalogError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Catalog API returned non-success status"
            );
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect(),
            });
        }

        Ok(body)
    }

    /// GET `url` and decode the JSON body.
    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        let body = self.fetch(url).await?;
        decode_json(&body)
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        match &self.inner.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn store(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.inner.cache {
            cache.insert(key, value).await;
        }
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get every product in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        if let Some(CacheValue::Products(products)) = self.cached(&CacheKey::Products).await {
            debug!("Cache hit for products");
            return Ok(products.to_vec());
        }

        let products: Vec<Product> = self.fetch_json(self.endpoint(&["products"])).await?;

        self.store(CacheKey::Products, CacheValue::Products(products.clone().into()))
            .await;

        Ok(products)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] if the catalog has no such product,
    /// or another error if the API request fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let id_segment = id.to_string();
        let body = self.fetch(self.endpoint(&["products", id_segment.as_str()])).await?;
        let product = decode_product(&body, id)?;

        self.store(key, CacheValue::Product(Box::new(product.clone()))).await;

        Ok(product)
    }

    /// Get the products in one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn products_in_category(&self, category: &str) -> Result<Vec<Product>, CatalogError> {
        let key = CacheKey::Category(category.to_string());
        if let Some(CacheValue::Products(products)) = self.cached(&key).await {
            debug!("Cache hit for category");
            return Ok(products.to_vec());
        }

        let products: Vec<Product> = self
            .fetch_json(self.endpoint(&["products", "category", category]))
            .await?;

        self.store(key, CacheValue::Products(products.clone().into())).await;

        Ok(products)
    }

    /// Get the category names.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) = self.cached(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories.to_vec());
        }

        let categories: Vec<String> = self
            .fetch_json(self.endpoint(&["products", "categories"]))
            .await?;

        self.store(
            CacheKey::Categories,
            CacheValue::Categories(categories.clone().into()),
        )
        .await;

        Ok(categories)
    }

    /// Find products whose title contains `query`, ignoring case.
    ///
    /// A blank query matches nothing and makes no request.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let products = self.products().await?;
        Ok(filter_by_title(products, query))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Keep the products whose title contains `query`, ignoring case.
///
/// Catalog order is preserved.
#[must_use]
pub fn filter_by_title(products: Vec<Product>, query: &str) -> Vec<Product> {
    let needle = query.to_lowercase();
    products
        .into_iter()
        .filter(|product| product.title.to_lowercase().contains(&needle))
        .collect()
}

fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, CatalogError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse catalog response"
        );
        CatalogError::Parse(e)
    })
}

/// Decode a single-product response.
///
/// The catalog answers unknown ids with `200 OK` and an empty body (or
/// `null`), which is reported as [`CatalogError::NotFound`].
fn decode_product(body: &str, id: &ProductId) -> Result<Product, CatalogError> {
    let body = body.trim();
    if body.is_empty() || body == "null" {
        return Err(CatalogError::NotFound(format!("Product not found: {id}")));
    }
    decode_json(body)
}
