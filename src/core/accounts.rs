//! Account services: card registration, blocking, balance top-up, refund
//! and inquiry
//!
//! Each mutating operation is one cardholder write followed by one audit
//! entry. The audit write is best effort: once the cardholder is written the
//! operation has happened, so a failing audit write is only logged.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use tracing::{info, instrument, warn};

use crate::config::PosConfig;
use crate::core::audit_log::append_entry;
use crate::core::card_validator::{active_cardholder, find_cardholder};
use crate::store::{children, DataStore, STUDENT_USERS};
use crate::types::money::{decimal_to_json, format_currency, round_currency};
use crate::types::{AuditAction, AuditEntry, CardId, Cardholder, PosError, LRN_DIGITS};

/// Result of a top-up or refund
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceChange {
    /// Cardholder as read before the change
    pub cardholder: Cardholder,
    /// Amount loaded or returned
    pub amount: Decimal,
    /// Balance before the change
    pub previous_balance: Decimal,
    /// Balance after the change
    pub new_balance: Decimal,
}

/// Details of a card being registered
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Card identifier printed on the RFID card
    pub card: CardId,
    /// Learner reference number
    pub lrn_number: String,
    pub first_name: String,
    /// May be empty
    pub middle_name: String,
    pub last_name: String,
    /// Balance the card starts with
    pub initial_balance: Decimal,
}

/// Registration, blocking, top-up, refund and balance lookups against the
/// cardholder collection
pub struct AccountService<S: DataStore> {
    store: Arc<S>,
    config: PosConfig,
}

impl<S: DataStore> AccountService<S> {
    /// Create a service over `store` with the given limits
    pub fn new(store: Arc<S>, config: PosConfig) -> Self {
        AccountService { store, config }
    }

    /// Register a new card
    ///
    /// Names are trimmed and the opening balance is rounded to currency
    /// precision before anything is checked.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the LRN is not exactly [`LRN_DIGITS`] digits (`InvalidLrn`)
    /// - the first or last name is empty (`MissingField`)
    /// - the opening balance is negative (`InvalidAmount`) or above the
    ///   configured maximum (`InitialBalanceLimitExceeded`)
    /// - another cardholder carries the card or the LRN
    ///   (`CardAlreadyRegistered`, `LrnAlreadyRegistered`)
    /// - the store read or write fails (`Store`)
    #[instrument(skip(self, registration), fields(card = %registration.card))]
    pub async fn register_card(
        &self,
        registration: &Registration,
        cashier: &str,
    ) -> Result<Cardholder, PosError> {
        let lrn = registration.lrn_number.trim();
        if lrn.len() != LRN_DIGITS || !lrn.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PosError::InvalidLrn {
                input: lrn.to_string(),
                digits: LRN_DIGITS,
            });
        }
        let first_name = required(&registration.first_name, "First name")?;
        let last_name = required(&registration.last_name, "Last name")?;
        let middle_name = registration.middle_name.trim();

        let initial_balance = round_currency(registration.initial_balance);
        if initial_balance < Decimal::ZERO {
            return Err(PosError::invalid_amount(registration.initial_balance));
        }
        if initial_balance > self.config.max_initial_balance {
            return Err(PosError::InitialBalanceLimitExceeded {
                limit: self.config.max_initial_balance,
            });
        }

        let card = registration.card.as_str();
        let users = self.store.get(STUDENT_USERS).await?.unwrap_or(Value::Null);
        for (key, doc) in children(&users) {
            let existing = Cardholder::from_json(key, doc);
            if existing.id_number == card {
                return Err(PosError::CardAlreadyRegistered {
                    card: card.to_string(),
                });
            }
            if existing.lrn_number == lrn {
                return Err(PosError::LrnAlreadyRegistered {
                    lrn: lrn.to_string(),
                });
            }
        }

        let document = json!({
            "id_number": card,
            "lrn_number": lrn,
            "student_fname": first_name,
            "student_mname": middle_name,
            "student_lname": last_name,
            "balance": decimal_to_json(initial_balance),
            "createdTime": Utc::now().to_rfc3339(),
            "disabled": false,
        });
        let key = self.store.push(STUDENT_USERS, document.clone()).await?;
        let cardholder = Cardholder::from_json(&key, &document);
        info!(key = %key, "card registered");

        let message = format!(
            "{cashier} registered a student: {} (card {card})",
            cardholder.full_name()
        );
        self.audit(AuditAction::UserCreated, cashier, message, &cardholder)
            .await;
        Ok(cardholder)
    }

    /// Block or unblock a card
    ///
    /// A blocked card is refused by purchases, top-ups and refunds; balance
    /// inquiries still answer. Setting the state a card already has is
    /// accepted and logged again.
    ///
    /// # Errors
    ///
    /// `CardNotFound` if no cardholder carries the identifier, `Store` if the
    /// read or the write fails.
    #[instrument(skip(self, card), fields(card = %card))]
    pub async fn set_disabled(
        &self,
        card: &CardId,
        disabled: bool,
        cashier: &str,
    ) -> Result<Cardholder, PosError> {
        let mut cardholder = self.balance_inquiry(card).await?;

        let mut fields = Map::new();
        fields.insert("disabled".to_string(), Value::Bool(disabled));
        self.store
            .update(&format!("{STUDENT_USERS}/{}", cardholder.key), fields)
            .await?;
        cardholder.disabled = disabled;

        let (kind, verb) = if disabled {
            (AuditAction::AccountDisabled, "disabled")
        } else {
            (AuditAction::AccountEnabled, "enabled")
        };
        info!(disabled, "account status changed");

        let message = format!(
            "{cashier} {verb} card {card} ({})",
            cardholder.full_name()
        );
        self.audit(kind, cashier, message, &cardholder).await;
        Ok(cardholder)
    }

    /// Load balance onto a card
    ///
    /// # Arguments
    ///
    /// * `card` - Card to load
    /// * `amount` - Amount to add
    /// * `cashier` - Who performs the load, recorded in the audit log
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `amount` is zero or negative once rounded to cents (`InvalidAmount`)
    /// - `amount` exceeds the single top-up limit (`TopUpLimitExceeded`)
    /// - the card is unknown or disabled (`CardNotFound`, `AccountDisabled`)
    /// - the new balance would exceed the ceiling (`BalanceCeilingExceeded`)
    /// - the balance write fails (`Store`)
    #[instrument(skip(self, card), fields(card = %card))]
    pub async fn top_up(
        &self,
        card: &CardId,
        amount: Decimal,
        cashier: &str,
    ) -> Result<BalanceChange, PosError> {
        let amount = positive_amount(amount)?;
        if amount > self.config.max_top_up {
            return Err(PosError::TopUpLimitExceeded {
                limit: self.config.max_top_up,
            });
        }

        let cardholder = active_cardholder(self.store.as_ref(), card).await?;
        let new_balance = round_currency(cardholder.balance + amount);
        if new_balance > self.config.max_balance {
            return Err(PosError::BalanceCeilingExceeded {
                ceiling: self.config.max_balance,
            });
        }

        let change = self.write_balance(cardholder, amount, new_balance).await?;
        info!(amount = %amount, new_balance = %change.new_balance, "balance loaded");

        let message = format!(
            "{cashier} loaded {} to card {card} ({})",
            format_currency(amount),
            change.cardholder.full_name()
        );
        self.audit(AuditAction::AddLoad, cashier, message, &change.cardholder)
            .await;
        Ok(change)
    }

    /// Return money from a card to its holder
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `amount` is zero or negative once rounded to cents (`InvalidAmount`)
    /// - `amount` exceeds the single refund limit (`RefundLimitExceeded`)
    /// - the card is unknown or disabled (`CardNotFound`, `AccountDisabled`)
    /// - `amount` exceeds the current balance (`RefundExceedsBalance`)
    /// - the balance write fails (`Store`)
    #[instrument(skip(self, card), fields(card = %card))]
    pub async fn refund(
        &self,
        card: &CardId,
        amount: Decimal,
        cashier: &str,
    ) -> Result<BalanceChange, PosError> {
        let amount = positive_amount(amount)?;
        if amount > self.config.max_refund {
            return Err(PosError::RefundLimitExceeded {
                limit: self.config.max_refund,
            });
        }

        let cardholder = active_cardholder(self.store.as_ref(), card).await?;
        if amount > cardholder.balance {
            return Err(PosError::RefundExceedsBalance {
                balance: cardholder.balance,
                requested: amount,
            });
        }

        let new_balance = round_currency(cardholder.balance - amount);
        let change = self.write_balance(cardholder, amount, new_balance).await?;
        info!(amount = %amount, new_balance = %change.new_balance, "money returned");

        let message = format!(
            "{cashier} returned {} from card {card} ({})",
            format_currency(amount),
            change.cardholder.full_name()
        );
        self.audit(AuditAction::ReturnMoney, cashier, message, &change.cardholder)
            .await;
        Ok(change)
    }

    /// Look up the cardholder behind a card
    ///
    /// Disabled accounts are returned as well; check
    /// [`Cardholder::disabled`].
    ///
    /// # Errors
    ///
    /// `CardNotFound` if no cardholder carries the identifier.
    pub async fn balance_inquiry(&self, card: &CardId) -> Result<Cardholder, PosError> {
        find_cardholder(self.store.as_ref(), card)
            .await?
            .ok_or_else(|| PosError::card_not_found(card.as_str()))
    }

    async fn write_balance(
        &self,
        cardholder: Cardholder,
        amount: Decimal,
        new_balance: Decimal,
    ) -> Result<BalanceChange, PosError> {
        let mut fields = Map::new();
        fields.insert("balance".to_string(), decimal_to_json(new_balance));
        self.store
            .update(&format!("{STUDENT_USERS}/{}", cardholder.key), fields)
            .await?;

        Ok(BalanceChange {
            previous_balance: cardholder.balance,
            cardholder,
            amount,
            new_balance,
        })
    }

    async fn audit(
        &self,
        kind: AuditAction,
        cashier: &str,
        message: String,
        cardholder: &Cardholder,
    ) {
        let entry = AuditEntry::new(kind, cashier, message).with_lrn(&cardholder.lrn_number);
        if let Err(e) = append_entry(self.store.as_ref(), &entry).await {
            warn!(error = %e, action = %entry.action, "audit log write failed");
        }
    }
}

/// Round to cents, then require more than zero
fn positive_amount(amount: Decimal) -> Result<Decimal, PosError> {
    let rounded = round_currency(amount);
    if rounded <= Decimal::ZERO {
        return Err(PosError::invalid_amount(amount));
    }
    Ok(rounded)
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, PosError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PosError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(value)
}
