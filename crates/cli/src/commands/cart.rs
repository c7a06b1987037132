//! Cart commands.
//!
//! Each command operates on a loaded `CartStore` and leaves a Sentry
//! breadcrumb so a later failure report shows what the user did.

use tracing::info;

use fakestore_core::{CurrencyCode, ProductId};
use fakestore_storefront::cart::CartStore;
use fakestore_storefront::catalog::CatalogClient;
use fakestore_storefront::error::{AppError, Result, add_breadcrumb};
use fakestore_storefront::storage::Storage;

use super::catalog::fetch_product;

/// Print every line and the cart totals.
pub fn show<S: Storage>(store: &CartStore<S>, currency: CurrencyCode) {
    add_breadcrumb("cart", "Viewed cart", None);

    if store.is_empty() {
        info!("Cart is empty");
        return;
    }

    for item in store.cart_items() {
        info!(
            id = %item.id,
            title = %item.title,
            quantity = item.quantity,
            unit_price = %item.price.display(currency),
            line_total = %item.line_total().display(currency),
            "Cart line"
        );
    }
    info!(
        items = store.total_item_count(),
        total = %store.total_price().display(currency),
        "Cart total"
    );
}

/// Fetch a product from the catalog and add one unit of it.
///
/// # Errors
///
/// Returns an error if the product cannot be fetched or the cart cannot be
/// saved.
pub async fn add<S: Storage>(
    store: &mut CartStore<S>,
    client: &CatalogClient,
    id: &ProductId,
) -> Result<()> {
    let id_text = id.to_string();
    add_breadcrumb("cart", "Add to cart", Some(&[("product_id", id_text.as_str())]));

    let product = fetch_product(client, id).await?;
    store.add_to_cart(&product)?;

    let quantity = store.get(id).map_or(0, |item| item.quantity);
    info!(id = %id, title = %product.title, quantity, "Added to cart");
    Ok(())
}

/// Remove a line from the cart.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the cart, or an error
/// if the cart cannot be saved.
pub fn remove<S: Storage>(store: &mut CartStore<S>, id: &ProductId) -> Result<()> {
    let id_text = id.to_string();
    add_breadcrumb("cart", "Remove from cart", Some(&[("product_id", id_text.as_str())]));

    if store.get(id).is_none() {
        return Err(not_in_cart(id));
    }
    store.remove_from_cart(id)?;

    info!(id = %id, "Removed from cart");
    Ok(())
}

/// Set a line's quantity; zero or less removes it.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not in the cart, or an error
/// if the cart cannot be saved.
pub fn update<S: Storage>(store: &mut CartStore<S>, id: &ProductId, quantity: i64) -> Result<()> {
    let id_text = id.to_string();
    let quantity_text = quantity.to_string();
    add_breadcrumb(
        "cart",
        "Update quantity",
        Some(&[
            ("product_id", id_text.as_str()),
            ("quantity", quantity_text.as_str()),
        ]),
    );

    if store.get(id).is_none() {
        return Err(not_in_cart(id));
    }
    store.update_quantity(id, quantity)?;

    match store.get(id) {
        Some(item) => info!(id = %id, quantity = item.quantity, "Updated quantity"),
        None => info!(id = %id, "Removed from cart"),
    }
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the cart cannot be saved.
pub fn clear<S: Storage>(store: &mut CartStore<S>) -> Result<()> {
    add_breadcrumb("cart", "Cleared cart", None);
    store.clear_cart()?;
    info!("Cart cleared");
    Ok(())
}

/// How a checkout is paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PaymentMethod {
    /// Credit or debit card
    Card,
    /// Cash on delivery
    Cod,
}

impl PaymentMethod {
    const fn label(self) -> &'static str {
        match self {
            Self::Card => "Credit/Debit Card",
            Self::Cod => "Cash on Delivery",
        }
    }
}

/// Place the order for everything in the cart, then empty it.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the cart is empty, or an error if the
/// cleared cart cannot be saved.
pub fn checkout<S: Storage>(
    store: &mut CartStore<S>,
    currency: CurrencyCode,
    payment: PaymentMethod,
) -> Result<()> {
    add_breadcrumb("cart", "Checkout", Some(&[("payment", payment.label())]));

    if store.is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    let items = store.total_item_count();
    let total = store.total_price().display(currency);
    store.clear_cart()?;

    info!(
        items,
        total = %total,
        payment = payment.label(),
        "Thank you for your order"
    );
    Ok(())
}

fn not_in_cart(id: &ProductId) -> AppError {
    AppError::NotFound(format!("product {id} is not in the cart"))
}
