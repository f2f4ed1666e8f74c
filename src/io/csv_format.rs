//! CSV format handling for cart input and report output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CartItemRecord structure for deserializing a cart file
//! - Conversion from CSV records to cart items
//! - Catalog and sales report serialization
//!
//! All functions work on `Read`/`Write` handles and never touch the
//! filesystem themselves.

use std::io::{Read, Write};
use std::str::FromStr;

use csv::{ReaderBuilder, Trim, Writer};
use serde::Deserialize;
use tracing::warn;

use crate::core::SalesReport;
use crate::types::{format_currency, Product, ProductKey};

/// One product and quantity to put in the cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    /// Key of the product in the store
    pub product_key: ProductKey,
    /// Units to add, at least 1
    pub quantity: u32,
}

impl FromStr for CartItem {
    type Err = String;

    /// Parse `KEY` or `KEY:QTY`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, quantity) = match s.rsplit_once(':') {
            Some((key, quantity)) => (key, Some(quantity.to_string())),
            None => (s, None),
        };
        convert_cart_record(CartItemRecord {
            product: key.to_string(),
            quantity,
        })
    }
}

/// CSV record structure for deserialization
///
/// Matches the cart file format with columns: product, quantity. The quantity
/// column is optional and defaults to 1.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CartItemRecord {
    pub product: String,
    pub quantity: Option<String>,
}

/// Convert a CartItemRecord to a CartItem
///
/// # Returns
///
/// Result containing either:
/// - Ok(CartItem) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_cart_record(record: CartItemRecord) -> Result<CartItem, String> {
    let product_key = record.product.trim();
    if product_key.is_empty() {
        return Err("Missing product key".to_string());
    }

    let quantity = match record.quantity.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(text) => match text.parse::<u32>() {
            Ok(0) | Err(_) => {
                return Err(format!(
                    "Invalid quantity '{text}' for product {product_key}"
                ))
            }
            Ok(quantity) => quantity,
        },
    };

    Ok(CartItem {
        product_key: product_key.to_string(),
        quantity,
    })
}

/// Read cart items from CSV
///
/// Rows that cannot be parsed or converted are logged and skipped.
pub fn read_cart_items<R: Read>(input: R) -> Vec<CartItem> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    reader
        .deserialize::<CartItemRecord>()
        .filter_map(|row| match row {
            Ok(record) => match convert_cart_record(record) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "skipping cart row");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "CSV parse error");
                None
            }
        })
        .collect()
}

/// Write the catalog in CSV format
///
/// Columns: key, name, category, price, quantity. Rows keep the order of
/// `products`.
pub fn write_catalog_csv(products: &[Product], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["key", "name", "category", "price", "quantity"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for product in products {
        writer
            .write_record([
                product.key.clone(),
                product.name.clone(),
                product.category.clone(),
                format_currency(product.price),
                product.quantity.to_string(),
            ])
            .map_err(|e| format!("Failed to write product record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}

/// Write per-product sales in CSV format
///
/// Columns: product, units_sold, revenue (two decimals), in report order.
pub fn write_sales_csv(report: &SalesReport, output: &mut dyn Write) -> Result<(), String> {
    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["product", "units_sold", "revenue"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for sales in &report.products {
        writer
            .write_record([
                sales.name.clone(),
                sales.units_sold.to_string(),
                format_currency(sales.revenue),
            ])
            .map_err(|e| format!("Failed to write sales record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))
}
