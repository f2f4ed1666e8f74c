//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `audit`: Audit log entries and their type tags
//! - `card`: Card identifier parsing and sanitising
//! - `cardholder`: Cardholder (student account) records
//! - `error`: Error types for the point-of-sale core and the store
//! - `money`: Currency parsing, rounding and formatting
//! - `product`: Product records
//! - `purchase`: Cart lines, purchase records, and receipts

pub mod audit;
pub mod card;
pub mod cardholder;
pub mod error;
pub mod money;
pub mod product;
pub mod purchase;

pub use audit::{AuditAction, AuditEntry};
pub use card::{CardId, CARD_DIGITS};
pub use cardholder::{Cardholder, LRN_DIGITS};
pub use error::{PosError, StockShortage, StoreError};
pub use money::format_currency;
pub use product::{Product, ProductKey};
pub use purchase::{CartLine, PurchaseLine, PurchaseRecord, Receipt};
