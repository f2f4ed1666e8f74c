//! Cardholder (student account) records

use super::money::decimal_from_json;
use rust_decimal::Decimal;
use serde_json::Value;

/// Number of digits of a learner reference number
pub const LRN_DIGITS: usize = 12;

/// A cardholder account in the `student_users` collection
#[derive(Debug, Clone, PartialEq)]
pub struct Cardholder {
    /// Store-assigned key
    pub key: String,
    /// Card identifier matched against scanned RFID values
    pub id_number: String,
    /// Learner reference number, empty when not recorded
    pub lrn_number: String,
    /// First name
    pub first_name: String,
    /// Middle name
    pub middle_name: String,
    /// Last name
    pub last_name: String,
    /// Spendable balance; missing or unparsable balances read as zero
    pub balance: Decimal,
    /// Disabled accounts cannot buy, load or withdraw
    pub disabled: bool,
}

impl Cardholder {
    /// Build a cardholder from its JSON document
    ///
    /// `id_number` may be stored as a number or a string; both compare as the
    /// string form. Name fields accept either the `student_*` or the plain
    /// `first_name`/`middle_name`/`last_name` spelling.
    pub fn from_json(key: &str, doc: &Value) -> Self {
        let text = |fields: &[&str]| {
            fields
                .iter()
                .find_map(|field| doc.get(*field).and_then(value_as_text))
                .unwrap_or_default()
        };

        Cardholder {
            key: key.to_string(),
            id_number: text(&["id_number"]),
            lrn_number: text(&["lrn_number"]),
            first_name: text(&["student_fname", "first_name"]),
            middle_name: text(&["student_mname", "middle_name"]),
            last_name: text(&["student_lname", "last_name"]),
            balance: doc
                .get("balance")
                .and_then(decimal_from_json)
                .unwrap_or(Decimal::ZERO),
            disabled: doc.get("disabled").and_then(Value::as_bool) == Some(true),
        }
    }

    /// Full name with single spaces and no dangling separators
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .flat_map(|part| part.split_whitespace())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
