//! Canteen POS Library
//! # Overview
//!
//! This library provides the purchase-flow core of a canteen point-of-sale
//! system in which students pay with prepaid RFID cards.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Product, Cardholder, CardId, PurchaseRecord, etc.)
//! - [`store`] - The document store collaborator and its in-memory implementation
//! - [`core`] - Business logic components:
//!   - [`core::catalog`] - Catalog Cache, refreshed wholesale
//!   - [`core::cart`] - The in-progress purchase
//!   - [`core::card_validator`] - Cardholder, account status and balance checks
//!   - [`core::stock_validator`] - Pre-commit stock re-check
//!   - [`core::committer`] - Multi-write purchase commit with partial-failure reporting
//!   - [`core::flow`] / [`core::session`] - Purchase state machine and cashier session
//!   - [`core::accounts`] - Card registration, blocking, top-up, refund and balance inquiry
//!   - [`core::audit_log`] - Activity log append and filtered listing
//!   - [`core::reports`] - Sales report
//! - [`io`] - Snapshot files and CSV input/output
//! - [`cli`] - CLI arguments parsing and command execution
//! - [`config`] / [`telemetry`] - Limits and tracing setup
//!
//! # Purchase Flow
//!
//! ```text
//! Idle -> Confirming -> Processing -> Succeeded | Failed -> Idle
//! ```
//!
//! Processing runs the card validator, the stock validator and the committer
//! strictly in sequence and stops at the first failure:
//!
//! - **Card**: the card must belong to an enabled cardholder whose balance
//!   covers the total
//! - **Stock**: every line is re-read from the store; all short lines are
//!   reported together
//! - **Commit**: stock, balance, purchase record and audit entry are written
//!   concurrently; a partial failure names each write that did and did not land
//!   and nothing is rolled back

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod store;
pub mod telemetry;
pub mod types;

pub use config::PosConfig;
pub use core::{AccountService, Cart, CatalogCache, PurchaseState, SalesReport, Session};
pub use store::{DataStore, MemoryStore};
pub use types::{
    AuditAction, AuditEntry, CardId, Cardholder, CartLine, PosError, Product, PurchaseRecord,
    Receipt, StoreError,
};
