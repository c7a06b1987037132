//! Cache types for catalog API responses.

use std::sync::Arc;

use fakestore_core::{Product, ProductId};

/// Cache key for products and categories.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
    Category(String),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Arc<[Product]>),
    Product(Box<Product>),
    Categories(Arc<[String]>),
}
