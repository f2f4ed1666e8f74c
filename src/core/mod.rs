//! Core point-of-sale logic
//!
//! This module contains the purchase flow components, leaf to root:
//! - `catalog` - Catalog Cache, the in-memory mirror of the product collection
//! - `cart` - The in-progress purchase
//! - `card_validator` - Cardholder lookup, account status and balance checks
//! - `stock_validator` - Pre-commit stock re-check
//! - `committer` - The multi-write purchase commit
//! - `flow` - Purchase state machine (reducer)
//! - `session` - Cashier session tying the above together
//!
//! and the services around it:
//! - `accounts` - Card registration, blocking, top-up, refund and balance inquiry
//! - `audit_log` - The `logs` collection and its filters
//! - `reports` - Sales report

pub mod accounts;
pub mod audit_log;
pub mod card_validator;
pub mod cart;
pub mod catalog;
pub mod committer;
pub mod flow;
pub mod reports;
pub mod session;
pub mod stock_validator;

pub use accounts::{AccountService, BalanceChange, Registration};
pub use audit_log::LogFilter;
pub use card_validator::validate_card;
pub use cart::Cart;
pub use catalog::{CatalogCache, Page, ALL_CATEGORIES};
pub use committer::{commit, CommitRequest};
pub use flow::{transition, Effect, PurchaseEvent, PurchaseState, Quote};
pub use reports::{ProductSales, SalesReport};
pub use session::{CardField, Session};
pub use stock_validator::{validate_stock, StockUpdate};
