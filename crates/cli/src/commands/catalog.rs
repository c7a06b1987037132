//! Catalog browsing commands.

use tracing::info;

use fakestore_core::{CurrencyCode, Product, ProductId};
use fakestore_storefront::catalog::{CatalogClient, CatalogError};
use fakestore_storefront::error::{AppError, Result};

/// List products, optionally restricted to one category.
///
/// # Errors
///
/// Returns an error if the catalog request fails.
pub async fn products(
    client: &CatalogClient,
    currency: CurrencyCode,
    category: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let products = match category {
        Some(name) => client.products_in_category(name).await?,
        None => client.products().await?,
    };

    let total = products.len();
    let shown = limit.unwrap_or(total).min(total);
    for product in products.iter().take(shown) {
        log_product_line(product, currency);
    }

    info!(shown, total, "Listed products");
    Ok(())
}

/// List category names.
///
/// # Errors
///
/// Returns an error if the catalog request fails.
pub async fn categories(client: &CatalogClient) -> Result<()> {
    let categories = client.categories().await?;
    for name in &categories {
        info!(category = %name, "Category");
    }
    info!(count = categories.len(), "Listed categories");
    Ok(())
}

/// Show one product in full.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the catalog has no such product.
pub async fn product(client: &CatalogClient, currency: CurrencyCode, id: &ProductId) -> Result<()> {
    let product = fetch_product(client, id).await?;

    info!(
        id = %product.id,
        title = %product.title,
        price = %product.price.display(currency),
        category = %product.category,
        image = %product.image,
        "Product"
    );
    if !product.description.is_empty() {
        info!(description = %product.description, "Description");
    }
    if let Some(rating) = &product.rating {
        info!(rate = rating.rate, count = rating.count, "Rating");
    }
    Ok(())
}

/// Search product titles.
///
/// # Errors
///
/// Returns an error if the catalog request fails.
pub async fn search(client: &CatalogClient, currency: CurrencyCode, query: &str) -> Result<()> {
    let results = client.search(query).await?;
    for product in &results {
        log_product_line(product, currency);
    }
    info!(query = %query.trim(), matches = results.len(), "Search complete");
    Ok(())
}

/// Fetch a product, turning a catalog miss into `AppError::NotFound`.
pub(crate) async fn fetch_product(client: &CatalogClient, id: &ProductId) -> Result<Product> {
    client.product(id).await.map_err(|err| match err {
        CatalogError::NotFound(_) => AppError::NotFound(format!("product {id}")),
        other => AppError::Catalog(other),
    })
}

fn log_product_line(product: &Product, currency: CurrencyCode) {
    info!(
        id = %product.id,
        price = %product.price.display(currency),
        title = %product.title,
        "Product"
    );
}
