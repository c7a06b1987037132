//! Catalog product records.
//!
//! These mirror the JSON served by the catalog API. Only `id`, `title`,
//! `price` and `image` are required; everything else is optional so that a
//! sparse or partially migrated catalog still decodes.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product as served by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog key.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Unit price.
    pub price: Price,
    /// Image URL.
    pub image: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Category name (e.g., `electronics`).
    #[serde(default)]
    pub category: String,
    /// Aggregate customer rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

/// Aggregate customer rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Mean score out of 5.
    pub rate: f64,
    /// Number of ratings.
    pub count: u32,
}
