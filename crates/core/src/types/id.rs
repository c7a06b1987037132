//! Catalog product identifiers.
//!
//! The catalog hands out product keys as JSON integers, but nothing guarantees
//! that every source does. [`ProductId`] accepts either form and treats the key
//! as opaque: it is only ever compared, hashed and displayed.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// An opaque catalog product key.
///
/// Serialized untagged, so `1` and `"sku-1"` both round-trip as-is.
/// Integer and string keys never compare equal, even when they print the
/// same (`1` vs `"1"`).
///
/// # Example
///
/// ```rust
/// # use fakestore_core::ProductId;
/// let numeric: ProductId = "42".parse().unwrap();
/// assert_eq!(numeric, ProductId::from(42));
///
/// let text: ProductId = "sku-42".parse().unwrap();
/// assert_eq!(text, ProductId::from("sku-42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    /// Integer key, as issued by the catalog API.
    Number(i64),
    /// Free-form string key.
    Text(String),
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for ProductId {
    type Err = core::convert::Infallible;

    /// Integers parse as [`ProductId::Number`], anything else as [`ProductId::Text`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(s.parse::<i64>()
            .map_or_else(|_| Self::Text(s.to_owned()), Self::Number))
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}
