//! Error types for the canteen point-of-sale core
//!
//! Every error surfaced here is recoverable from the cashier's point of view:
//! the purchase flow returns to `Idle` or `Failed` with the cart intact and the
//! error's `Display` text is shown verbatim.
//!
//! # Error Categories
//!
//! - **Input Errors**: empty cart, malformed card identifier, invalid amounts
//! - **Account Errors**: unknown card, disabled account, insufficient balance,
//!   limits on loads and refunds, duplicate registrations
//! - **Inventory Errors**: product removed, insufficient stock
//! - **Commit Errors**: partial failure of the multi-write purchase commit
//! - **Store Errors**: failures reported by the document store collaborator

use crate::types::money::format_currency;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors reported by a [`DataStore`](crate::store::DataStore) implementation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The path is empty or contains an empty segment
    #[error("Invalid store path '{path}'")]
    InvalidPath {
        /// The rejected path
        path: String,
    },

    /// The store could not complete the request (network, permission, ...)
    #[error("Store unavailable at '{path}': {message}")]
    Unavailable {
        /// Path the request was addressed to
        path: String,
        /// Description reported by the store
        message: String,
    },

    /// A record could not be encoded as a JSON document
    #[error("Cannot encode document for '{path}': {message}")]
    Encode {
        /// Path the document was meant for
        path: String,
        /// Serializer error
        message: String,
    },

    /// A field merge was addressed to something that is not an object
    #[error("Cannot update '{path}': target is not an object")]
    NotAnObject {
        /// Path of the non-object document
        path: String,
    },
}

/// One cart line that cannot be served from current stock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortage {
    /// Display name of the product
    pub name: String,
    /// Units currently in stock
    pub available: u32,
    /// Units requested by the cart
    pub requested: u32,
}

impl std::fmt::Display for StockShortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (Available: {}, Requested: {})",
            self.name, self.available, self.requested
        )
    }
}

/// Main error type for the point-of-sale core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PosError {
    /// The purchase was triggered with nothing in the cart
    #[error("No items in cart. Add products before purchasing.")]
    CartEmpty,

    /// The scanned or typed card identifier is not exactly the expected digits
    #[error("Invalid card number '{input}': expected {digits} digits")]
    InvalidCardFormat {
        /// The rejected input
        input: String,
        /// Required number of digits
        digits: usize,
    },

    /// No cardholder record carries this card identifier
    #[error("Card not found: {card}")]
    CardNotFound {
        /// The scanned card identifier
        card: String,
    },

    /// The cardholder account exists but is disabled
    #[error("This account is disabled: {card}")]
    AccountDisabled {
        /// The scanned card identifier
        card: String,
    },

    /// The cardholder's balance does not cover the cart total
    #[error(
        "Insufficient balance. Current balance: {}, required: {}",
        format_currency(*balance),
        format_currency(*required)
    )]
    InsufficientBalance {
        /// Balance at validation time
        balance: Decimal,
        /// Cart total
        required: Decimal,
    },

    /// Cart lines refer to products that no longer exist
    #[error("Product not found: {}", names.join(", "))]
    ProductMissing {
        /// Display names captured in the cart lines, in cart order
        names: Vec<String>,
    },

    /// One or more cart lines exceed current stock
    #[error(
        "Insufficient stock for: {}",
        shortages.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("; ")
    )]
    InsufficientStock {
        /// Every failing line, in cart order
        shortages: Vec<StockShortage>,
    },

    /// Some of the purchase writes were applied and some were not
    ///
    /// Successful writes are not rolled back.
    #[error(
        "Purchase partially failed. Failed writes: {}. Succeeded writes: {}",
        failed.join(", "),
        if succeeded.is_empty() { "none".to_string() } else { succeeded.join(", ") }
    )]
    PartialCommitFailure {
        /// Descriptions of writes that were applied
        succeeded: Vec<String>,
        /// Descriptions of writes that failed, with the store's reason
        failed: Vec<String>,
    },

    /// The cashier dismissed the confirmation
    #[error("Purchase cancelled")]
    Cancelled,

    /// A purchase is already being processed in this session
    #[error("A purchase is already being processed. Please wait.")]
    PurchaseInProgress,

    /// A top-up or refund amount is zero, negative or unparsable
    #[error("Invalid amount '{amount}': must be greater than 0")]
    InvalidAmount {
        /// The rejected amount as entered
        amount: String,
    },

    /// A single top-up exceeds the configured maximum
    #[error("Maximum single transaction is {}", format_currency(*limit))]
    TopUpLimitExceeded {
        /// Configured maximum per top-up
        limit: Decimal,
    },

    /// A top-up would push the balance past the configured ceiling
    #[error("Balance cannot exceed {}", format_currency(*ceiling))]
    BalanceCeilingExceeded {
        /// Configured balance ceiling
        ceiling: Decimal,
    },

    /// A refund asks for more than the cardholder holds
    #[error(
        "Return amount {} exceeds balance {}",
        format_currency(*requested),
        format_currency(*balance)
    )]
    RefundExceedsBalance {
        /// Current balance
        balance: Decimal,
        /// Requested refund
        requested: Decimal,
    },

    /// A single refund exceeds the configured maximum
    #[error("Maximum return limit is {}", format_currency(*limit))]
    RefundLimitExceeded {
        /// Configured maximum per refund
        limit: Decimal,
    },

    /// Another cardholder already carries this card identifier
    #[error("Card number is already registered: {card}")]
    CardAlreadyRegistered {
        /// The card identifier being registered
        card: String,
    },

    /// Another cardholder already carries this learner reference number
    #[error("LRN is already registered: {lrn}")]
    LrnAlreadyRegistered {
        /// The learner reference number being registered
        lrn: String,
    },

    /// The learner reference number is not exactly the expected digits
    #[error("Invalid LRN '{input}': expected {digits} digits")]
    InvalidLrn {
        /// The rejected input
        input: String,
        /// Required number of digits
        digits: usize,
    },

    /// A required registration field is empty
    #[error("{field} is required")]
    MissingField {
        /// Human name of the field
        field: String,
    },

    /// The opening balance of a new card exceeds the configured maximum
    #[error("Initial balance cannot exceed {}", format_currency(*limit))]
    InitialBalanceLimitExceeded {
        /// Configured maximum opening balance
        limit: Decimal,
    },

    /// The document store failed during a read or a single-write operation
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PosError {
    /// Create an InvalidCardFormat error
    pub fn invalid_card_format(input: &str, digits: usize) -> Self {
        PosError::InvalidCardFormat {
            input: input.to_string(),
            digits,
        }
    }

    /// Create a CardNotFound error
    pub fn card_not_found(card: &str) -> Self {
        PosError::CardNotFound {
            card: card.to_string(),
        }
    }

    /// Create an AccountDisabled error
    pub fn account_disabled(card: &str) -> Self {
        PosError::AccountDisabled {
            card: card.to_string(),
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(balance: Decimal, required: Decimal) -> Self {
        PosError::InsufficientBalance { balance, required }
    }

    /// Create a ProductMissing error for a single product
    pub fn product_missing(name: &str) -> Self {
        PosError::ProductMissing {
            names: vec![name.to_string()],
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: impl ToString) -> Self {
        PosError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    /// Whether this is a user-initiated cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, PosError::Cancelled)
    }
}
