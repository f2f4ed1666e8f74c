//! Currency helpers shared by the cart, validators, and reports
//!
//! Amounts live in the document store as loosely-typed JSON: sometimes a
//! number, sometimes a numeric string, sometimes absent. Everything inside the
//! crate works in [`Decimal`]; these helpers sit at the boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Number of decimal places used for display and for persisted amounts
pub const CURRENCY_DP: u32 = 2;

/// Round an amount to currency precision, midpoints away from zero
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(
        CURRENCY_DP,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    )
}

/// Format an amount with exactly two decimals, e.g. `75.00`
pub fn format_currency(amount: Decimal) -> String {
    format!("{:.2}", round_currency(amount))
}

/// Parse a JSON value into a decimal amount
///
/// Accepts JSON numbers and numeric strings (surrounding whitespace is
/// ignored). Returns `None` for anything else, including `null`.
pub fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Convert an amount into the JSON number written to the store
pub fn decimal_to_json(amount: Decimal) -> Value {
    let rounded = round_currency(amount);
    // whole amounts stay integral
    if rounded.fract().is_zero() {
        if let Some(whole) = rounded.to_i64() {
            return Value::from(whole);
        }
    }
    Value::from(rounded.to_f64().unwrap_or(0.0))
}

/// Parse a non-negative integer count (stock quantity) from JSON
///
/// Missing, negative, or unparsable counts read as zero.
pub fn count_from_json(value: Option<&Value>) -> u32 {
    value
        .and_then(decimal_from_json)
        .and_then(|d| d.trunc().to_u32())
        .unwrap_or(0)
}
