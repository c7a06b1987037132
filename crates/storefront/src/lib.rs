//! Fakestore Storefront library.
//!
//! The client-side core of the storefront: a persisted shopping cart, the
//! durable storage slot it is mirrored to, and a read-only client for the
//! product catalog that feeds it.
//!
//! # Architecture
//!
//! - [`cart::CartStore`] owns the cart. It is constructed once at startup,
//!   rehydrated from a [`storage::Storage`] slot, and passed by reference to
//!   whatever renders it. Every mutation writes the whole cart back.
//! - [`catalog::CatalogClient`] fetches products and categories over HTTP and
//!   caches them in memory via `moka`.
//! - [`config::StorefrontConfig`] is loaded from the environment.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod storage;
