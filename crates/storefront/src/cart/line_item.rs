//! Cart line items and the persisted snapshot format.

use fakestore_core::{Price, Product, ProductId};
use serde::{Deserialize, Serialize};

/// One product in the cart with its quantity.
///
/// Display fields are copied from the catalog product when the line is first
/// created and never refreshed, so a later catalog price change does not
/// reach items already in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    pub image: String,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLineItem {
    /// Start a new line for `product` with quantity 1.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            title: product.title.clone(),
            price: product.price,
            image: product.image.clone(),
            quantity: 1,
        }
    }

    /// `price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price * self.quantity
    }
}

/// Sum of `price * quantity` over `items`.
#[must_use]
pub fn total_price(items: &[CartLineItem]) -> Price {
    items.iter().map(CartLineItem::line_total).sum()
}

/// Sum of quantities over `items`.
#[must_use]
pub fn total_item_count(items: &[CartLineItem]) -> u64 {
    items.iter().map(|item| u64::from(item.quantity)).sum()
}

// =============================================================================
// Snapshot decoding
// =============================================================================

/// A line as found in a persisted snapshot, before invariants are applied.
///
/// Unknown fields are ignored, display fields may be missing, and a missing
/// quantity means 1.
#[derive(Debug, Deserialize)]
struct StoredLineItem {
    id: ProductId,
    #[serde(default)]
    title: String,
    price: Price,
    #[serde(default)]
    image: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
}

const fn default_quantity() -> i64 {
    1
}

/// Decode a persisted snapshot into a sequence satisfying the cart invariants.
///
/// Each line is decoded on its own: a line that cannot be read (no id, no
/// price, a non-integer quantity) is dropped and the rest are kept. Lines with
/// a quantity below 1 are dropped, quantities above `u32::MAX` are clamped,
/// and repeated ids are merged into the first occurrence.
///
/// # Errors
///
/// Returns an error if `raw` is not a JSON array.
pub fn decode_snapshot(raw: &str) -> Result<Vec<CartLineItem>, serde_json::Error> {
    let lines: Vec<serde_json::Value> = serde_json::from_str(raw)?;

    let stored = lines
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            serde_json::from_value::<StoredLineItem>(value)
                .inspect_err(|e| {
                    tracing::warn!(index, error = %e, "Dropping unreadable stored cart line");
                })
                .ok()
        })
        .collect::<Vec<_>>();

    let mut items: Vec<CartLineItem> = Vec::with_capacity(stored.len());
    for line in stored {
        if line.quantity < 1 {
            tracing::warn!(
                product_id = %line.id,
                quantity = line.quantity,
                "Dropping stored cart line with non-positive quantity"
            );
            continue;
        }
        let quantity = u32::try_from(line.quantity).unwrap_or(u32::MAX);

        if let Some(existing) = items.iter_mut().find(|item| item.id == line.id) {
            tracing::warn!(product_id = %line.id, "Merging duplicate stored cart line");
            existing.quantity = existing.quantity.saturating_add(quantity);
            continue;
        }

        items.push(CartLineItem {
            id: line.id,
            title: line.title,
            price: line.price,
            image: line.image,
            quantity,
        });
    }

    Ok(items)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i64, cents: i64, quantity: u32) -> CartLineItem {
        CartLineItem {
            id: ProductId::from(id),
            title: format!("Product {id}"),
            price: Price::from_minor_units(cents),
            image: format!("https://img.example/{id}.jpg"),
            quantity,
        }
    }

    #[test]
    fn test_totals() {
        let items = vec![line(1, 10000, 2), line(2, 5000, 3)];
        assert_eq!(total_price(&items), Price::from_minor_units(35000));
        assert_eq!(total_item_count(&items), 5);
    }

    #[test]
    fn test_totals_empty() {
        assert_eq!(total_price(&[]), Price::ZERO);
        assert_eq!(total_item_count(&[]), 0);
    }

    #[test]
    fn test_from_product_copies_display_fields_only() {
        let product = Product {
            id: ProductId::from(9),
            title: "Mug".to_string(),
            price: Price::from_minor_units(499),
            image: "mug.png".to_string(),
            description: "A mug".to_string(),
            category: "kitchen".to_string(),
            rating: None,
        };

        let item = CartLineItem::from_product(&product);
        assert_eq!(item, CartLineItem {
            id: ProductId::from(9),
            title: "Mug".to_string(),
            price: Price::from_minor_units(499),
            image: "mug.png".to_string(),
            quantity: 1,
        });

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 9,
                "title": "Mug",
                "price": 4.99,
                "image": "mug.png",
                "quantity": 1
            })
        );
    }

    #[test]
    fn test_decode_snapshot_round_trip() {
        let items = vec![line(1, 10995, 2), line(2, 2230, 1)];
        let raw = serde_json::to_string(&items).unwrap();
        assert_eq!(decode_snapshot(&raw).unwrap(), items);
    }

    #[test]
    fn test_decode_snapshot_is_tolerant() {
        let raw = r#"[
            {"id": 1, "title": "A", "price": 10, "image": "a.png", "description": "extra"},
            {"id": "sku-2", "price": 2.5, "quantity": 4}
        ]"#;

        let items = decode_snapshot(raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[1].id, ProductId::from("sku-2"));
        assert_eq!(items[1].title, "");
        assert_eq!(items[1].quantity, 4);
    }

    #[test]
    fn test_decode_snapshot_restores_invariants() {
        let raw = r#"[
            {"id": 1, "title": "A", "price": 10, "image": "a.png", "quantity": 2},
            {"id": 2, "title": "B", "price": 20, "image": "b.png", "quantity": 0},
            {"id": 3, "title": "C", "price": 30, "image": "c.png", "quantity": -4},
            {"id": 1, "title": "A", "price": 10, "image": "a.png", "quantity": 3}
        ]"#;

        let items = decode_snapshot(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, ProductId::from(1));
        assert_eq!(items[0].quantity, 5);
    }

    #[test]
    fn test_decode_snapshot_keeps_readable_lines() {
        let raw = r#"[
            {"id": 1, "title": "A", "price": 10, "image": "a.png", "quantity": 2},
            {"id": 2, "title": "B", "image": "b.png", "quantity": 1},
            {"title": "no id", "price": 1},
            {"id": 4, "title": "D", "price": 4, "image": "d.png", "quantity": 2.5},
            "garbage",
            {"id": 5, "title": "E", "price": 5, "image": "e.png"}
        ]"#;

        let items = decode_snapshot(raw).unwrap();
        let kept: Vec<(ProductId, u32)> =
            items.iter().map(|item| (item.id.clone(), item.quantity)).collect();
        assert_eq!(kept, vec![(ProductId::from(1), 2), (ProductId::from(5), 1)]);
    }

    #[test]
    fn test_decode_snapshot_malformed() {
        assert!(decode_snapshot("not json").is_err());
        assert!(decode_snapshot(r#"{"id": 1}"#).is_err());
        assert!(decode_snapshot(r#"[{"id": 1}"#).is_err());
    }
}
