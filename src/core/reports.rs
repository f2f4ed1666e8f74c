//! Sales reporting over the `purchases` collection

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::store::{children, DataStore, PURCHASES};
use crate::types::money::round_currency;
use crate::types::{Product, PurchaseRecord, StoreError};

/// Units and revenue of one product across all purchases
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSales {
    /// Product name as recorded at time of sale
    pub name: String,
    /// Units sold
    pub units_sold: u64,
    /// Sum of line subtotals
    pub revenue: Decimal,
}

/// Summary of sales and stock
#[derive(Debug, Clone, PartialEq)]
pub struct SalesReport {
    /// Number of purchase records
    pub purchase_count: usize,
    /// Sum of all purchase totals
    pub total_sales: Decimal,
    /// Sales in the 7 days before the report time
    pub last_7_days: Decimal,
    /// Sales in the 30 days before the report time
    pub last_30_days: Decimal,
    /// Sales in the 365 days before the report time
    pub last_365_days: Decimal,
    /// Per product, most units sold first, ties by name
    pub products: Vec<ProductSales>,
    /// Catalog products at or below the low-stock threshold, emptiest first
    pub low_stock: Vec<Product>,
}

impl SalesReport {
    /// Aggregate `purchases` and flag low stock in `catalog`
    ///
    /// # Arguments
    ///
    /// * `purchases` - Every stored purchase record
    /// * `catalog` - Current non-archived products
    /// * `now` - Reference time for the rolling windows
    /// * `low_stock_threshold` - Stock level at or below which a product is flagged
    pub fn build(
        purchases: &[PurchaseRecord],
        catalog: &[Product],
        now: DateTime<Utc>,
        low_stock_threshold: u32,
    ) -> Self {
        let since = |days: i64| (now - Duration::days(days)).timestamp_millis();
        let windows = [since(7), since(30), since(365)];
        let mut window_sales = [Decimal::ZERO; 3];
        let mut total_sales = Decimal::ZERO;
        let mut by_product: BTreeMap<&str, (u64, Decimal)> = BTreeMap::new();

        for purchase in purchases {
            total_sales += purchase.total_price;
            for (cutoff, sales) in windows.iter().zip(window_sales.iter_mut()) {
                if purchase.timestamp >= *cutoff {
                    *sales += purchase.total_price;
                }
            }
            for line in &purchase.products {
                let entry = by_product
                    .entry(line.product_name.as_str())
                    .or_insert((0, Decimal::ZERO));
                entry.0 += u64::from(line.quantity);
                entry.1 += line.subtotal;
            }
        }

        let mut products: Vec<ProductSales> = by_product
            .into_iter()
            .map(|(name, (units_sold, revenue))| ProductSales {
                name: name.to_string(),
                units_sold,
                revenue: round_currency(revenue),
            })
            .collect();
        products.sort_by(|a, b| {
            b.units_sold
                .cmp(&a.units_sold)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut low_stock: Vec<Product> = catalog
            .iter()
            .filter(|p| p.quantity <= low_stock_threshold)
            .cloned()
            .collect();
        low_stock.sort_by(|a, b| {
            a.quantity
                .cmp(&b.quantity)
                .then_with(|| a.name.cmp(&b.name))
        });

        let [last_7_days, last_30_days, last_365_days] = window_sales.map(round_currency);
        SalesReport {
            purchase_count: purchases.len(),
            total_sales: round_currency(total_sales),
            last_7_days,
            last_30_days,
            last_365_days,
            products,
            low_stock,
        }
    }
}

/// Read every purchase record, oldest first
pub async fn load_purchases<S: DataStore>(store: &S) -> Result<Vec<PurchaseRecord>, StoreError> {
    let purchases = store.get(PURCHASES).await?.unwrap_or(Value::Null);
    let mut records: Vec<PurchaseRecord> = children(&purchases)
        .map(|(key, doc)| PurchaseRecord::from_json(key, doc))
        .collect();
    records.sort_by_key(|record| record.timestamp);
    Ok(records)
}
