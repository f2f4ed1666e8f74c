//! Audit log entries
//!
//! Every mutating action appends one human-readable entry to the `logs`
//! collection for later activity review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type tag of an audit log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A purchase was committed
    Purchase,
    /// Balance was loaded onto a card
    AddLoad,
    /// Balance was returned to a cardholder
    ReturnMoney,
    /// A user account was created
    UserCreated,
    /// A cardholder account was blocked
    AccountDisabled,
    /// A blocked cardholder account was unblocked
    AccountEnabled,
    /// Anything the reader does not recognise
    #[serde(other)]
    Other,
}

impl AuditAction {
    /// Human label, e.g. for the `action` column of the activity log
    pub fn label(&self) -> &'static str {
        match self {
            AuditAction::Purchase => "Purchase",
            AuditAction::AddLoad => "Add Load",
            AuditAction::ReturnMoney => "Return Money",
            AuditAction::UserCreated => "User Created",
            AuditAction::AccountDisabled => "Account Disabled",
            AuditAction::AccountEnabled => "Account Enabled",
            AuditAction::Other => "Other",
        }
    }

    /// The `type` tag as stored
    pub fn tag(&self) -> &'static str {
        match self {
            AuditAction::Purchase => "purchase",
            AuditAction::AddLoad => "add_load",
            AuditAction::ReturnMoney => "return_money",
            AuditAction::UserCreated => "user_created",
            AuditAction::AccountDisabled => "account_disabled",
            AuditAction::AccountEnabled => "account_enabled",
            AuditAction::Other => "other",
        }
    }
}

/// One entry in the `logs` collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// Human label of the action
    pub action: String,
    /// Machine-readable type tag
    #[serde(rename = "type")]
    pub kind: AuditAction,
    /// Who performed the action
    pub user: String,
    /// Free-text description
    pub message: String,
    /// When the action happened
    pub timestamp: DateTime<Utc>,
    /// Learner reference number of the affected cardholder, when relevant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lrn_number: Option<String>,
}

impl AuditEntry {
    /// Create an entry stamped with the current time
    pub fn new(kind: AuditAction, user: &str, message: impl Into<String>) -> Self {
        AuditEntry {
            action: kind.label().to_string(),
            kind,
            user: user.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            lrn_number: None,
        }
    }

    /// Attach the affected cardholder's learner reference number
    pub fn with_lrn(mut self, lrn: &str) -> Self {
        if !lrn.is_empty() {
            self.lrn_number = Some(lrn.to_string());
        }
        self
    }

    /// Read an entry back from the store
    ///
    /// Entries written by older clients may lack `type` or carry a timestamp
    /// that is not RFC 3339; those read as [`AuditAction::Other`] and the Unix
    /// epoch respectively.
    pub fn from_json(doc: &Value) -> Self {
        let text = |field: &str| {
            doc.get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let kind = doc
            .get("type")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(AuditAction::Other);
        let timestamp = doc
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                doc.get("timestamp")
                    .and_then(Value::as_i64)
                    .and_then(DateTime::from_timestamp_millis)
            })
            .unwrap_or_default();
        let user = match text("user") {
            u if u.is_empty() => "System".to_string(),
            u => u,
        };

        AuditEntry {
            action: text("action"),
            kind,
            user,
            message: text("message"),
            timestamp,
            lrn_number: doc
                .get("lrn_number")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}
