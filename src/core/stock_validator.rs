//! Stock Validator
//!
//! Re-reads the authoritative stock of every cart line right before a commit.
//! The Catalog Cache is never consulted here.
//!
//! The read-then-decide check is not atomic with the later stock writes. Two
//! sessions buying the last units of a product at the same time may both pass.

use futures::future::join_all;
use tracing::warn;

use crate::store::{DataStore, PRODUCTS};
use crate::types::money::count_from_json;
use crate::types::{CartLine, PosError, ProductKey, StockShortage};

/// Post-commit stock level of one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    /// Key of the product
    pub product_key: ProductKey,
    /// Display name captured in the cart line
    pub name: String,
    /// Stock read from the store
    pub current: u32,
    /// `current - requested`
    pub new_quantity: u32,
}

/// Check every cart line against current stock
///
/// All products are read concurrently and every line is checked before a
/// verdict is given, so the error lists every failing line.
///
/// # Returns
///
/// One [`StockUpdate`] per cart line, in cart order.
///
/// # Errors
///
/// * `PosError::ProductMissing` naming every line whose product record is
///   gone; this takes precedence over stock shortages
/// * `PosError::InsufficientStock` listing every line whose requested
///   quantity exceeds current stock
/// * `PosError::Store` if any read fails
pub async fn validate_stock<S: DataStore>(
    store: &S,
    lines: &[CartLine],
) -> Result<Vec<StockUpdate>, PosError> {
    let paths: Vec<String> = lines
        .iter()
        .map(|line| format!("{PRODUCTS}/{}", line.product_key))
        .collect();
    let reads = join_all(paths.iter().map(|path| store.get(path))).await;

    let mut missing = Vec::new();
    let mut shortages = Vec::new();
    let mut updates = Vec::with_capacity(lines.len());

    for (line, read) in lines.iter().zip(reads) {
        let Some(doc) = read? else {
            missing.push(line.name.clone());
            continue;
        };

        let current = count_from_json(doc.get("quantity"));
        if current < line.quantity {
            shortages.push(StockShortage {
                name: line.name.clone(),
                available: current,
                requested: line.quantity,
            });
            continue;
        }

        updates.push(StockUpdate {
            product_key: line.product_key.clone(),
            name: line.name.clone(),
            current,
            new_quantity: current - line.quantity,
        });
    }

    if !missing.is_empty() {
        warn!(products = ?missing, "products no longer exist");
        return Err(PosError::ProductMissing { names: missing });
    }
    if !shortages.is_empty() {
        warn!(lines = shortages.len(), "insufficient stock");
        return Err(PosError::InsufficientStock { shortages });
    }
    Ok(updates)
}
