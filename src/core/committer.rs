//! Purchase Committer
//!
//! Finalises a validated purchase by issuing every write concurrently:
//!
//! - one stock write per product (`products/<key>/quantity`)
//! - one balance write for the cardholder (`student_users/<key>/balance`)
//! - one new purchase record under `purchases`
//! - one new audit entry under `logs`
//!
//! The store offers no multi-path transaction. Every write is attempted, each
//! outcome is collected, and if any write failed the commit reports exactly
//! which writes landed and which did not. Writes that landed are not rolled
//! back.

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::core::catalog::CatalogCache;
use crate::core::stock_validator::StockUpdate;
use crate::store::{to_document, DataStore, LOGS, PRODUCTS, PURCHASES, STUDENT_USERS};
use crate::types::money::{decimal_to_json, format_currency, round_currency};
use crate::types::{
    AuditAction, AuditEntry, CartLine, Cardholder, PosError, PurchaseLine, PurchaseRecord,
    Receipt,
};

/// Everything the committer needs to finalise one purchase
#[derive(Debug, Clone, Copy)]
pub struct CommitRequest<'a> {
    /// Cardholder as read by the card validator
    pub cardholder: &'a Cardholder,
    /// Cart lines being bought
    pub lines: &'a [CartLine],
    /// Cart total
    pub total: Decimal,
    /// New stock levels from the stock validator
    pub stock: &'a [StockUpdate],
    /// Cashier ringing up the sale
    pub cashier: &'a str,
}

/// One remote write of the commit
#[derive(Debug)]
struct PlannedWrite {
    /// How the write is named in a partial-failure report
    label: String,
    path: String,
    value: Value,
}

/// Build the purchase record stored under `purchases/<purchase_id>`
pub fn purchase_record(
    request: &CommitRequest<'_>,
    purchase_id: &str,
    timestamp: i64,
) -> PurchaseRecord {
    PurchaseRecord {
        id_number: request.cardholder.id_number.clone(),
        lrn_number: request.cardholder.lrn_number.clone(),
        student_name: request.cardholder.full_name(),
        products: request.lines.iter().map(PurchaseLine::from).collect(),
        total_price: request.total,
        timestamp,
        purchase_id: purchase_id.to_string(),
        cashier: request.cashier.to_string(),
    }
}

fn audit_message(request: &CommitRequest<'_>) -> String {
    let units: u64 = request.lines.iter().map(|l| u64::from(l.quantity)).sum();
    format!(
        "{} sold {} item(s) totalling {} to {} (card {})",
        request.cashier,
        units,
        format_currency(request.total),
        request.cardholder.full_name(),
        request.cardholder.id_number
    )
}

/// Commit a validated purchase
///
/// # Arguments
///
/// * `store` - Document store receiving the writes
/// * `catalog` - Catalog Cache refreshed after a fully successful commit
/// * `request` - Validated cardholder, cart lines, total and stock levels
///
/// # Returns
///
/// The receipt shown to the cashier, carrying the new balance.
///
/// # Errors
///
/// * `PosError::Store` if the purchase record cannot be encoded
/// * `PosError::PartialCommitFailure` if at least one write failed; the
///   error names every write that succeeded and every write that failed
#[instrument(
    skip_all,
    fields(card = %request.cardholder.id_number, total = %request.total)
)]
pub async fn commit<S: DataStore>(
    store: &S,
    catalog: &CatalogCache,
    request: CommitRequest<'_>,
) -> Result<Receipt, PosError> {
    let new_balance = round_currency(request.cardholder.balance - request.total);
    let purchase_id = store.push_key(PURCHASES);
    let record = purchase_record(&request, &purchase_id, Utc::now().timestamp_millis());
    let entry = AuditEntry::new(AuditAction::Purchase, request.cashier, audit_message(&request))
        .with_lrn(&request.cardholder.lrn_number);

    let mut writes: Vec<PlannedWrite> = request
        .stock
        .iter()
        .map(|update| PlannedWrite {
            label: format!("stock of {}", update.name),
            path: format!("{PRODUCTS}/{}/quantity", update.product_key),
            value: Value::from(update.new_quantity),
        })
        .collect();
    writes.push(PlannedWrite {
        label: "cardholder balance".to_string(),
        path: format!("{STUDENT_USERS}/{}/balance", request.cardholder.key),
        value: decimal_to_json(new_balance),
    });
    let record_path = format!("{PURCHASES}/{purchase_id}");
    writes.push(PlannedWrite {
        label: "purchase record".to_string(),
        value: to_document(&record_path, &record)?,
        path: record_path,
    });
    let entry_path = format!("{LOGS}/{}", store.push_key(LOGS));
    writes.push(PlannedWrite {
        label: "audit log entry".to_string(),
        value: to_document(&entry_path, &entry)?,
        path: entry_path,
    });

    let outcomes = join_all(
        writes
            .iter()
            .map(|write| store.set(&write.path, write.value.clone())),
    )
    .await;

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for (write, outcome) in writes.iter().zip(outcomes) {
        match outcome {
            Ok(()) => succeeded.push(write.label.clone()),
            Err(e) => failed.push(format!("{} ({e})", write.label)),
        }
    }

    if !failed.is_empty() {
        error!(
            failed = ?failed,
            succeeded = ?succeeded,
            "purchase commit partially failed"
        );
        return Err(PosError::PartialCommitFailure { succeeded, failed });
    }

    info!(purchase_id = %purchase_id, %new_balance, "purchase committed");

    if let Err(e) = catalog.refresh(store).await {
        warn!(error = %e, "catalog refresh after commit failed");
    }

    Ok(Receipt {
        purchase_id,
        student_name: record.student_name,
        lines: record.products,
        total: request.total,
        new_balance,
    })
}
