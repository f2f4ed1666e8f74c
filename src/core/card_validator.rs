//! Card/Balance Validator
//!
//! Resolves a scanned card identifier to a cardholder and checks that the
//! account may pay a given total. Nothing is written.

use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::store::{children, DataStore, STUDENT_USERS};
use crate::types::{CardId, Cardholder, PosError};

/// Find the cardholder whose `id_number` equals the card identifier
///
/// Comparison is exact string equality against the stored value. When
/// several records carry the same identifier the first one in key order wins.
///
/// # Returns
///
/// * `Ok(Some(cardholder))` when a record matches
/// * `Ok(None)` when no record matches
/// * `Err(PosError::Store)` when the collection cannot be read
pub async fn find_cardholder<S: DataStore>(
    store: &S,
    card: &CardId,
) -> Result<Option<Cardholder>, PosError> {
    let users = store.get(STUDENT_USERS).await?.unwrap_or(Value::Null);

    let found = children(&users)
        .map(|(key, doc)| Cardholder::from_json(key, doc))
        .find(|cardholder| cardholder.id_number == card.as_str());
    Ok(found)
}

/// Find an enabled cardholder for the card identifier
///
/// # Errors
///
/// * `PosError::CardNotFound` if no record carries the identifier
/// * `PosError::AccountDisabled` if the matched record is disabled
pub async fn active_cardholder<S: DataStore>(
    store: &S,
    card: &CardId,
) -> Result<Cardholder, PosError> {
    let cardholder = find_cardholder(store, card)
        .await?
        .ok_or_else(|| PosError::card_not_found(card.as_str()))?;

    if cardholder.disabled {
        return Err(PosError::account_disabled(card.as_str()));
    }
    Ok(cardholder)
}

/// Validate that the card may pay `total`
///
/// # Arguments
///
/// * `store` - Document store holding the `student_users` collection
/// * `card` - Scanned card identifier
/// * `total` - Cart total to be charged
///
/// # Returns
///
/// The matched cardholder, including its store key and the balance read at
/// validation time.
///
/// # Errors
///
/// Returns an error if:
/// - No cardholder carries the identifier (`CardNotFound`)
/// - The account is disabled (`AccountDisabled`)
/// - The balance is below `total` (`InsufficientBalance`)
/// - The store read fails (`Store`)
pub async fn validate_card<S: DataStore>(
    store: &S,
    card: &CardId,
    total: Decimal,
) -> Result<Cardholder, PosError> {
    let cardholder = active_cardholder(store, card).await.inspect_err(|e| {
        warn!(card = %card, error = %e, "card rejected");
    })?;

    if cardholder.balance < total {
        warn!(card = %card, balance = %cardholder.balance, %total, "insufficient balance");
        return Err(PosError::insufficient_balance(cardholder.balance, total));
    }

    debug!(card = %card, key = %cardholder.key, "card validated");
    Ok(cardholder)
}
