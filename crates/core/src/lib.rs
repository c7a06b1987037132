//! Fakestore Core - Shared types library.
//!
//! This crate provides common types used across all Fakestore components:
//! - `storefront` - Cart store, durable storage slot and catalog client
//! - `cli` - Command-line view layer for browsing and cart management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product identifiers, prices, currencies and catalog records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
