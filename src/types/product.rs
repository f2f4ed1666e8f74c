//! Product records as the sale page sees them
//!
//! Products are created and edited elsewhere (inventory management); the
//! point-of-sale core only reads them and decrements `quantity`.

use super::money::{count_from_json, decimal_from_json};
use rust_decimal::Decimal;
use serde_json::Value;

/// Store-assigned product key (opaque)
pub type ProductKey = String;

/// A product in the `products` collection
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    /// Store-assigned key
    pub key: ProductKey,
    /// Display name
    pub name: String,
    /// Unit price, never negative
    pub price: Decimal,
    /// Units in stock
    pub quantity: u32,
    /// Category label, empty when uncategorised
    pub category: String,
    /// Image shown on the product card, empty when none
    pub image_url: String,
    /// Free-text description used by search
    pub description: String,
    /// Whether the product is archived (hidden from sale)
    pub archived: bool,
}

impl Product {
    /// Build a product from its JSON document
    ///
    /// Missing fields fall back to empty strings / zero, a negative price is
    /// clamped to zero. A product is archived when `archived` is `true` or
    /// `status` equals `"archived"` in any letter case.
    pub fn from_json(key: &str, doc: &Value) -> Self {
        let text = |field: &str| {
            doc.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let archived = doc.get("archived").and_then(Value::as_bool) == Some(true)
            || doc
                .get("status")
                .and_then(Value::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case("archived"));

        Product {
            key: key.to_string(),
            name: text("name"),
            price: doc
                .get("price")
                .and_then(decimal_from_json)
                .unwrap_or_default()
                .max(Decimal::ZERO),
            quantity: count_from_json(doc.get("quantity")),
            category: text("category"),
            image_url: text("imageUrl"),
            description: text("description"),
            archived,
        }
    }

    /// Whether at least one unit can be added to a cart
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}
