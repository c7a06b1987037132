//! Shared fixtures for the fakestore integration tests.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p fakestore-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - Cart Store restart and reload behavior over the
//!   file-backed storage slot
//! - `catalog_to_cart` - Products fetched by the catalog client flowing into
//!   the cart, against a local canned catalog

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fakestore_core::{Price, Product, ProductId};
use fakestore_storefront::config::CatalogConfig;
use fakestore_storefront::storage::FileStorage;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Build a catalog product with a numeric id and a price given in minor units.
#[must_use]
pub fn product(id: i64, title: &str, cents: i64) -> Product {
    product_with_id(ProductId::from(id), title, cents)
}

/// Build a catalog product with any kind of id.
#[must_use]
pub fn product_with_id(id: ProductId, title: &str, cents: i64) -> Product {
    Product {
        image: format!("https://img.example/{id}.jpg"),
        id,
        title: title.to_string(),
        price: Price::from_minor_units(cents),
        description: format!("{title} description"),
        category: "misc".to_string(),
        rating: None,
    }
}

/// A fresh directory with a file-backed storage slot inside it.
///
/// The directory is deleted when the returned `TempDir` is dropped, so keep it
/// alive for as long as the storage is in use.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
#[allow(clippy::expect_used)]
pub fn temp_storage() -> (TempDir, FileStorage) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let storage = FileStorage::new(dir.path().join("slot"));
    (dir, storage)
}

/// A canned catalog server answering `GET` requests by path.
///
/// Unknown paths get a 404 with an empty body.
pub struct CannedCatalog {
    pub base_url: Url,
}

impl CannedCatalog {
    /// Bind to an ephemeral local port and serve `routes` until the runtime
    /// shuts down.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    #[allow(clippy::expect_used)]
    pub async fn start(routes: HashMap<String, String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let routes = Arc::new(routes);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                tokio::spawn(async move {
                    let mut buf = vec![0_u8; 4096];
                    let Ok(read) = socket.read(&mut buf).await else {
                        return;
                    };
                    let request = String::from_utf8_lossy(buf.get(..read).unwrap_or_default());
                    let path = request.split_whitespace().nth(1).unwrap_or("/");

                    let (status, body) = routes
                        .get(path)
                        .map_or(("404 Not Found", ""), |body| ("200 OK", body.as_str()));
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).expect("valid local URL"),
        }
    }

    /// Catalog client configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> CatalogConfig {
        CatalogConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(60),
        }
    }
}
