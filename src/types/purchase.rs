//! Cart lines, purchase records, and receipts
//!
//! A [`CartLine`] is transient and memory-only. A [`PurchaseRecord`] is what
//! gets appended to the `purchases` collection once per successful commit and
//! is never modified afterwards.

use super::money::{count_from_json, decimal_from_json, decimal_to_json, round_currency};
use super::product::ProductKey;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// One product entry in the in-progress purchase
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    /// Key of the product in the store
    pub product_key: ProductKey,
    /// Name captured when the line was created
    pub name: String,
    /// Unit price captured when the line was created
    pub unit_price: Decimal,
    /// Units selected, always at least 1 while the line exists
    pub quantity: u32,
    /// Image captured when the line was created
    pub image_url: String,
    /// Category captured when the line was created
    pub category: String,
}

impl CartLine {
    /// `quantity * unit_price`, unrounded
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

fn serialize_amount<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    decimal_to_json(*amount).serialize(serializer)
}

/// Line item inside a purchase record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseLine {
    /// Product name at time of sale
    pub product_name: String,
    /// Units sold
    pub quantity: u32,
    /// Unit price at time of sale
    #[serde(serialize_with = "serialize_amount")]
    pub price: Decimal,
    /// `quantity * price`
    #[serde(serialize_with = "serialize_amount")]
    pub subtotal: Decimal,
    /// Product image, if any
    #[serde(rename = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Key of the product sold
    pub product_key: ProductKey,
}

impl From<&CartLine> for PurchaseLine {
    fn from(line: &CartLine) -> Self {
        PurchaseLine {
            product_name: line.name.clone(),
            quantity: line.quantity,
            price: line.unit_price,
            subtotal: round_currency(line.subtotal()),
            image_url: (!line.image_url.is_empty()).then(|| line.image_url.clone()),
            product_key: line.product_key.clone(),
        }
    }
}

impl PurchaseLine {
    /// Read a line item back from a stored purchase record
    ///
    /// Returns `None` for entries that carry no product name.
    pub fn from_json(doc: &Value) -> Option<Self> {
        let product_name = doc.get("product_name")?.as_str()?.to_string();
        let quantity = count_from_json(doc.get("quantity"));
        let price = doc
            .get("price")
            .and_then(decimal_from_json)
            .unwrap_or_default();
        let subtotal = doc
            .get("subtotal")
            .and_then(decimal_from_json)
            .unwrap_or_else(|| price * Decimal::from(quantity));

        Some(PurchaseLine {
            product_name,
            quantity,
            price,
            subtotal,
            image_url: doc
                .get("imageUrl")
                .and_then(Value::as_str)
                .map(str::to_string),
            product_key: doc
                .get("product_key")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// Append-only record of a completed purchase
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseRecord {
    /// Card identifier of the buyer
    pub id_number: String,
    /// Learner reference number of the buyer
    pub lrn_number: String,
    /// Buyer's full name
    pub student_name: String,
    /// Items sold
    pub products: Vec<PurchaseLine>,
    /// Sum of line subtotals
    #[serde(rename = "totalPrice", serialize_with = "serialize_amount")]
    pub total_price: Decimal,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Key of this record in the `purchases` collection
    pub purchase_id: String,
    /// Cashier who rang up the sale
    pub cashier: String,
}

impl PurchaseRecord {
    /// Read the fields the sales report needs from a stored purchase
    pub fn from_json(key: &str, doc: &Value) -> Self {
        let text = |field: &str| {
            doc.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let products: Vec<PurchaseLine> = doc
            .get("products")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(PurchaseLine::from_json).collect())
            .unwrap_or_default();
        let total_price = doc
            .get("totalPrice")
            .and_then(decimal_from_json)
            .unwrap_or_else(|| products.iter().map(|p| p.subtotal).sum());

        PurchaseRecord {
            id_number: text("id_number"),
            lrn_number: text("lrn_number"),
            student_name: text("student_name"),
            products,
            total_price,
            timestamp: doc.get("timestamp").and_then(Value::as_i64).unwrap_or(0),
            purchase_id: key.to_string(),
            cashier: text("cashier"),
        }
    }
}

/// What the cashier sees after a successful purchase
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Key of the stored purchase record
    pub purchase_id: String,
    /// Buyer's full name
    pub student_name: String,
    /// Itemised lines
    pub lines: Vec<PurchaseLine>,
    /// Amount charged
    pub total: Decimal,
    /// Balance after the debit
    pub new_balance: Decimal,
}
