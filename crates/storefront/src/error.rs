//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures infrastructure errors to
//! Sentry before they are reported to the user. Commands that touch the cart
//! or the catalog should return `Result<T, AppError>`.

use thiserror::Error;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A cart mutation could not be persisted.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Catalog API operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this error points at the environment rather than the user's
    /// input, and so belongs in Sentry.
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        match self {
            Self::Cart(_) => true,
            Self::Catalog(err) => !matches!(err, CatalogError::NotFound(_)),
            Self::Config(_) | Self::NotFound(_) | Self::BadRequest(_) => false,
        }
    }

    /// Log the error, capturing infrastructure errors to Sentry.
    pub fn report(&self) {
        if self.is_infrastructure() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command error"
            );
        } else {
            tracing::error!(error = %self, "Command error");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
