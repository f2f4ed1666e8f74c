//! Point-of-sale configuration
//!
//! Limits and thresholds that the canteen administration can tune. Invalid
//! values never abort startup; they are replaced by the defaults with a
//! warning.

use rust_decimal::Decimal;
use tracing::warn;

use crate::types::CARD_DIGITS;

/// Tunable limits for the purchase, top-up and reporting flows
#[derive(Clone, Debug, PartialEq)]
pub struct PosConfig {
    /// Exact number of digits on a card identifier
    pub card_digits: usize,
    /// Largest amount accepted in a single top-up
    pub max_top_up: Decimal,
    /// Largest balance an account may hold after a top-up
    pub max_balance: Decimal,
    /// Largest amount returned to a cardholder in a single refund
    pub max_refund: Decimal,
    /// Largest opening balance of a newly registered card
    pub max_initial_balance: Decimal,
    /// Products at or below this stock count are reported as low stock
    pub low_stock_threshold: u32,
    /// Page size of the product grid
    pub products_per_page: usize,
}

impl Default for PosConfig {
    fn default() -> Self {
        Self {
            card_digits: CARD_DIGITS,
            max_top_up: Decimal::new(5_000, 0),
            max_balance: Decimal::new(50_000, 0),
            max_refund: Decimal::new(5_000, 0),
            max_initial_balance: Decimal::new(250, 0),
            low_stock_threshold: 5,
            products_per_page: 12,
        }
    }
}

impl PosConfig {
    /// Create a PosConfig with custom limits
    ///
    /// Zero or negative limits fall back to the defaults, as does a balance
    /// ceiling below the single top-up limit. A negative opening-balance limit
    /// falls back too; zero is allowed and means cards start empty.
    pub fn new(
        max_top_up: Decimal,
        max_balance: Decimal,
        max_refund: Decimal,
        max_initial_balance: Decimal,
        low_stock_threshold: u32,
        products_per_page: usize,
    ) -> Self {
        let default = Self::default();

        let max_top_up = if max_top_up <= Decimal::ZERO {
            warn!(
                %max_top_up,
                default = %default.max_top_up,
                "Invalid max_top_up, using default"
            );
            default.max_top_up
        } else {
            max_top_up
        };

        let max_balance = if max_balance <= Decimal::ZERO || max_balance < max_top_up {
            warn!(
                %max_balance,
                default = %default.max_balance.max(max_top_up),
                "Invalid max_balance, using default"
            );
            default.max_balance.max(max_top_up)
        } else {
            max_balance
        };

        let max_refund = if max_refund <= Decimal::ZERO {
            warn!(
                %max_refund,
                default = %default.max_refund,
                "Invalid max_refund, using default"
            );
            default.max_refund
        } else {
            max_refund
        };

        let max_initial_balance = if max_initial_balance < Decimal::ZERO {
            warn!(
                %max_initial_balance,
                default = %default.max_initial_balance,
                "Invalid max_initial_balance, using default"
            );
            default.max_initial_balance
        } else {
            max_initial_balance
        };

        let products_per_page = if products_per_page == 0 {
            warn!(
                default = default.products_per_page,
                "Invalid products_per_page (0), using default"
            );
            default.products_per_page
        } else {
            products_per_page
        };

        Self {
            card_digits: default.card_digits,
            max_top_up,
            max_balance,
            max_refund,
            max_initial_balance,
            low_stock_threshold,
            products_per_page,
        }
    }
}
