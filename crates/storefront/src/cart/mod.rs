//! Shopping cart state and its persistence.
//!
//! # Architecture
//!
//! - [`CartStore`] is an explicit value, built once at startup with
//!   [`CartStore::load`] and handed by reference to whatever displays or
//!   edits the cart. There is no global instance.
//! - Mutators take `&mut self`, so there is exactly one writer at a time.
//! - Every mutation is applied in memory, published to subscribers, then
//!   written through to the [`Storage`] slot under [`CART_STORAGE_KEY`]. A
//!   failed write is reported to the caller but does not roll back the
//!   in-memory change.
//! - Totals are recomputed from the line items on every read.
//!
//! # Example
//!
//! ```rust,ignore
//! use fakestore_storefront::cart::CartStore;
//! use fakestore_storefront::storage::FileStorage;
//!
//! let mut cart = CartStore::load(FileStorage::new(&config.storage_dir));
//!
//! let product = catalog.product(&id).await?;
//! cart.add_to_cart(&product)?;
//! cart.update_quantity(&product.id, 3)?;
//!
//! println!("{} items, {}", cart.total_item_count(), cart.total_price());
//! ```

mod line_item;

pub use line_item::{CartLineItem, decode_snapshot, total_item_count, total_price};

use fakestore_core::{Price, Product, ProductId};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::storage::{Storage, StorageError};

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "cart_items";

/// Errors returned by cart mutations.
///
/// Both variants mean the in-memory cart was updated but the durable copy
/// was not.
#[derive(Debug, Error)]
pub enum CartError {
    /// The cart could not be encoded.
    #[error("failed to serialize cart: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The storage slot rejected the write.
    #[error("failed to persist cart: {0}")]
    Persist(#[from] StorageError),
}

/// The shopping cart.
#[derive(Debug)]
pub struct CartStore<S: Storage> {
    storage: S,
    items: Vec<CartLineItem>,
    changes: watch::Sender<Vec<CartLineItem>>,
}

impl<S: Storage> CartStore<S> {
    /// Build the cart, rehydrating it from `storage`.
    ///
    /// A missing, unreadable or malformed snapshot yields an empty cart.
    pub fn load(storage: S) -> Self {
        let items = match storage.get(CART_STORAGE_KEY) {
            Ok(Some(raw)) => decode_snapshot(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding malformed cart snapshot");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read cart snapshot, starting empty");
                Vec::new()
            }
        };

        debug!(lines = items.len(), "Cart loaded");

        let (changes, _) = watch::channel(items.clone());
        Self {
            storage,
            items,
            changes,
        }
    }

    /// Current line items, in insertion order.
    #[must_use]
    pub fn cart_items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Find the line for `id`.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartLineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub fn total_price(&self) -> Price {
        total_price(&self.items)
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        total_item_count(&self.items)
    }

    /// Watch the cart.
    ///
    /// The receiver holds the latest line items and is marked changed after
    /// every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartLineItem>> {
        self.changes.subscribe()
    }

    /// Add one unit of `product`.
    ///
    /// An existing line keeps its position and gains one unit; otherwise a new
    /// line is appended with the product's current display fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_to_cart(&mut self, product: &Product) -> Result<(), CartError> {
        match self.position(&product.id) {
            Some(index) => {
                if let Some(item) = self.items.get_mut(index) {
                    item.quantity = item.quantity.saturating_add(1);
                }
            }
            None => self.items.push(CartLineItem::from_product(product)),
        }

        self.commit()
    }

    /// Remove the line for `id`. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn remove_from_cart(&mut self, id: &ProductId) -> Result<(), CartError> {
        let Some(index) = self.position(id) else {
            debug!("No cart line to remove");
            return Ok(());
        };

        self.items.remove(index);
        self.commit()
    }

    /// Set the quantity of the line for `id`. Unknown ids are ignored.
    ///
    /// A quantity of zero or less removes the line, so no line ever holds a
    /// quantity below 1. Values above `u32::MAX` are clamped.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub fn update_quantity(&mut self, id: &ProductId, quantity: i64) -> Result<(), CartError> {
        let Some(index) = self.position(id) else {
            debug!("No cart line to update");
            return Ok(());
        };

        if quantity < 1 {
            self.items.remove(index);
        } else if let Some(item) = self.items.get_mut(index) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }

        self.commit()
    }

    /// Remove every line.
    ///
    /// Always writes through, so the next load starts empty even if the cart
    /// was already empty in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    #[instrument(skip(self))]
    pub fn clear_cart(&mut self) -> Result<(), CartError> {
        self.items.clear();
        self.commit()
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    /// Publish the new state, then write it through.
    fn commit(&self) -> Result<(), CartError> {
        self.changes.send_replace(self.items.clone());

        let snapshot = serde_json::to_string(&self.items)?;
        self.storage.set(CART_STORAGE_KEY, &snapshot)?;

        debug!(
            lines = self.items.len(),
            items = self.total_item_count(),
            "Cart persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::storage::MemoryStorage;

    fn product(id: i64, cents: i64) -> Product {
        Product {
            id: ProductId::from(id),
            title: format!("Product {id}"),
            price: Price::from_minor_units(cents),
            image: format!("https://img.example/{id}.jpg"),
            description: String::new(),
            category: "electronics".to_string(),
            rating: None,
        }
    }

    fn ids(store: &CartStore<impl Storage>) -> Vec<(ProductId, u32)> {
        store
            .cart_items()
            .iter()
            .map(|item| (item.id.clone(), item.quantity))
            .collect()
    }

    /// Storage whose writes can be switched off.
    #[derive(Debug, Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_writes: Cell<bool>,
    }

    impl Storage for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.get() {
                return Err(StorageError::Unavailable("quota exceeded".to_string()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn test_starts_empty_without_snapshot() {
        let store = CartStore::load(MemoryStorage::new());
        assert!(store.is_empty());
        assert_eq!(store.total_price(), Price::ZERO);
        assert_eq!(store.total_item_count(), 0);
    }

    #[test]
    fn test_add_accumulates() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add_to_cart(&product(1, 1000)).unwrap();
        store.add_to_cart(&product(1, 1000)).unwrap();

        assert_eq!(ids(&store), vec![(ProductId::from(1), 2)]);
    }

    #[test]
    fn test_add_preserves_order() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add_to_cart(&product(1, 1000)).unwrap();
        store.add_to_cart(&product(2, 2000)).unwrap();
        store.add_to_cart(&product(1, 1000)).unwrap();

        assert_eq!(
            ids(&store),
            vec![(ProductId::from(1), 2), (ProductId::from(2), 1)]
        );
    }

    #[test]
    fn test_readd_keeps_original_price() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add_to_cart(&product(1, 1000)).unwrap();
        store.add_to_cart(&product(1, 9999)).unwrap();

        let line = store.get(&ProductId::from(1)).unwrap();
        assert_eq!(line.price, Price::from_minor_units(1000));
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn test_totals() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add_to_cart(&product(1, 10000)).unwrap();
        store.add_to_cart(&product(2, 5000)).unwrap();
        store.update_quantity(&ProductId::from(1), 2).unwrap();
        store.update_quantity(&ProductId::from(2), 3).unwrap();

        assert_eq!(store.total_price(), Price::from_minor_units(35000));
        assert_eq!(store.total_item_count(), 5);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add_to_cart(&product(1, 1000)).unwrap();
        store.add_to_cart(&product(2, 2000)).unwrap();

        store.remove_from_cart(&ProductId::from(1)).unwrap();
        let once = store.cart_items().to_vec();
        store.remove_from_cart(&ProductId::from(1)).unwrap();

        assert_eq!(store.cart_items(), once.as_slice());
        assert_eq!(ids(&store), vec![(ProductId::from(2), 1)]);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let storage = MemoryStorage::new();
        let mut store = CartStore::load(storage.clone());
        store.add_to_cart(&product(1, 1000)).unwrap();
        let before = store.cart_items().to_vec();
        let persisted = storage.get(CART_STORAGE_KEY).unwrap();

        store.update_quantity(&ProductId::from(999), 5).unwrap();
        store.remove_from_cart(&ProductId::from(999)).unwrap();

        assert_eq!(store.cart_items(), before.as_slice());
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap(), persisted);
    }

    #[test]
    fn test_update_quantity_sets_value() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add_to_cart(&product(1, 1000)).unwrap();
        store.update_quantity(&ProductId::from(1), 7).unwrap();

        assert_eq!(ids(&store), vec![(ProductId::from(1), 7)]);
    }

    #[test]
    fn test_update_quantity_non_positive_removes() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add_to_cart(&product(1, 1000)).unwrap();
        store.add_to_cart(&product(2, 1000)).unwrap();

        store.update_quantity(&ProductId::from(1), 0).unwrap();
        store.update_quantity(&ProductId::from(2), -3).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn test_update_quantity_clamps_large_values() {
        let mut store = CartStore::load(MemoryStorage::new());
        store.add_to_cart(&product(1, 1)).unwrap();
        store.update_quantity(&ProductId::from(1), i64::MAX).unwrap();

        assert_eq!(ids(&store), vec![(ProductId::from(1), u32::MAX)]);
    }

    #[test]
    fn test_every_mutation_persists() {
        let storage = MemoryStorage::new();
        let mut store = CartStore::load(storage.clone());

        store.add_to_cart(&product(1, 1000)).unwrap();
        let persisted = decode_snapshot(&storage.get(CART_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, store.cart_items());

        store.update_quantity(&ProductId::from(1), 4).unwrap();
        let persisted = decode_snapshot(&storage.get(CART_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted[0].quantity, 4);
    }

    #[test]
    fn test_persistence_round_trip() {
        let storage = MemoryStorage::new();
        let mut store = CartStore::load(storage.clone());
        store.add_to_cart(&product(1, 10995)).unwrap();
        store.add_to_cart(&product(2, 2230)).unwrap();
        store.add_to_cart(&product(1, 10995)).unwrap();
        let before = store.cart_items().to_vec();
        drop(store);

        let reloaded = CartStore::load(storage);
        assert_eq!(reloaded.cart_items(), before.as_slice());
    }

    #[test]
    fn test_clear_empties_and_persists() {
        let storage = MemoryStorage::new();
        let mut store = CartStore::load(storage.clone());
        store.add_to_cart(&product(1, 1000)).unwrap();
        store.clear_cart().unwrap();
        assert!(store.is_empty());
        drop(store);

        let reloaded = CartStore::load(storage);
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_clear_on_empty_cart_still_writes() {
        let storage = MemoryStorage::new();
        let mut store = CartStore::load(storage.clone());
        store.clear_cart().unwrap();

        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_malformed_snapshot_starts_empty() {
        let storage = MemoryStorage::new();
        storage.set(CART_STORAGE_KEY, "{not json").unwrap();

        let mut store = CartStore::load(storage.clone());
        assert!(store.is_empty());

        // The next mutation overwrites the bad snapshot
        store.add_to_cart(&product(1, 1000)).unwrap();
        assert_eq!(CartStore::load(storage).cart_items().len(), 1);
    }

    #[test]
    fn test_write_failure_keeps_in_memory_change() {
        let storage = FlakyStorage::default();
        let mut store = CartStore::load(&storage);
        store.add_to_cart(&product(1, 1000)).unwrap();

        storage.fail_writes.set(true);
        let err = store.add_to_cart(&product(2, 2000)).unwrap_err();
        assert!(matches!(err, CartError::Persist(StorageError::Unavailable(_))));

        // Memory moved on, durable copy did not
        assert_eq!(store.cart_items().len(), 2);
        let persisted = decode_snapshot(&storage.get(CART_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.len(), 1);

        // Recovers on the next successful write
        storage.fail_writes.set(false);
        store.update_quantity(&ProductId::from(2), 2).unwrap();
        let persisted = decode_snapshot(&storage.get(CART_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[test]
    fn test_subscribers_see_changes() {
        let mut store = CartStore::load(MemoryStorage::new());
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.add_to_cart(&product(1, 1000)).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        store.clear_cart().unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn test_subscribers_see_change_even_when_write_fails() {
        let storage = FlakyStorage::default();
        storage.fail_writes.set(true);
        let mut store = CartStore::load(&storage);
        let mut rx = store.subscribe();

        assert!(store.add_to_cart(&product(1, 1000)).is_err());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_wakes_on_change() {
        let mut store = CartStore::load(MemoryStorage::new());
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        let mut watcher_rx = store.subscribe();
        let watcher = tokio::spawn(async move {
            watcher_rx.changed().await.unwrap();
            watcher_rx.borrow_and_update().clone()
        });

        store.add_to_cart(&product(1, 1000)).unwrap();
        let first = watcher.await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].quantity, 1);

        store.add_to_cart(&product(1, 1000)).unwrap();

        rx.changed().await.unwrap();
        let latest = rx.borrow_and_update().clone();
        assert_eq!(latest, store.cart_items());
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].quantity, 2);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_totals_saturate_for_huge_lines() {
        let storage = MemoryStorage::new();
        storage
            .set(
                CART_STORAGE_KEY,
                r#"[{"id":1,"title":"x","price":1e20,"image":"","quantity":4294967295}]"#,
            )
            .unwrap();

        let mut store = CartStore::load(storage);
        assert_eq!(store.cart_items().len(), 1);
        assert_eq!(store.total_price(), Price::new(rust_decimal::Decimal::MAX));

        store.add_to_cart(&product(2, 100_000)).unwrap();
        store.update_quantity(&ProductId::from(2), i64::MAX).unwrap();
        assert_eq!(store.total_price(), Price::new(rust_decimal::Decimal::MAX));
        assert_eq!(store.total_item_count(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn test_unreadable_line_does_not_empty_cart() {
        let storage = MemoryStorage::new();
        storage
            .set(
                CART_STORAGE_KEY,
                r#"[
                    {"id":1,"title":"A","price":10,"image":"a","quantity":2},
                    {"id":2,"title":"B","image":"b","quantity":1}
                ]"#,
            )
            .unwrap();

        let store = CartStore::load(storage);
        assert_eq!(ids(&store), vec![(ProductId::from(1), 2)]);
    }
}
