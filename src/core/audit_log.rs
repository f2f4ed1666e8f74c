//! Append, read and filter the `logs` collection

use chrono::NaiveDate;
use serde_json::Value;

use crate::store::{children, to_document, DataStore, LOGS};
use crate::types::{AuditEntry, StoreError};

/// Append an entry under a fresh key and return the key
pub async fn append_entry<S: DataStore>(
    store: &S,
    entry: &AuditEntry,
) -> Result<String, StoreError> {
    let document = to_document(LOGS, entry)?;
    store.push(LOGS, document).await
}

/// Narrows an activity log listing; empty fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Action label (`Add Load`) or type tag (`add_load`), compared
    /// case-insensitively. Entries whose message mentions it match too.
    pub action: Option<String>,
    /// Case-insensitive text looked for in the message, user and action
    pub search: Option<String>,
    /// UTC calendar day the entry was written on
    pub date: Option<NaiveDate>,
}

impl LogFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        let message = entry.message.to_lowercase();

        if let Some(action) = normalized(&self.action) {
            let named = entry.action.to_lowercase() == action
                || entry.kind.label().to_lowercase() == action
                || entry.kind.tag() == action;
            if !named && !message.contains(&action) {
                return false;
            }
        }

        if let Some(search) = normalized(&self.search) {
            let found = message.contains(&search)
                || entry.user.to_lowercase().contains(&search)
                || entry.action.to_lowercase().contains(&search);
            if !found {
                return false;
            }
        }

        self.date
            .map_or(true, |day| entry.timestamp.date_naive() == day)
    }
}

fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// The `limit` most recent entries, newest first
pub async fn recent_entries<S: DataStore>(
    store: &S,
    limit: usize,
) -> Result<Vec<AuditEntry>, StoreError> {
    search_entries(store, &LogFilter::default(), limit).await
}

/// The `limit` most recent entries accepted by `filter`, newest first
///
/// Entries are ordered by timestamp, then by key, so entries whose timestamp
/// could not be read still come out in insertion order.
pub async fn search_entries<S: DataStore>(
    store: &S,
    filter: &LogFilter,
    limit: usize,
) -> Result<Vec<AuditEntry>, StoreError> {
    let logs = store.get(LOGS).await?.unwrap_or(Value::Null);

    let mut entries: Vec<(&String, AuditEntry)> = children(&logs)
        .map(|(key, doc)| (key, AuditEntry::from_json(doc)))
        .filter(|(_, entry)| filter.matches(entry))
        .collect();
    entries.sort_by(|(a_key, a), (b_key, b)| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b_key.cmp(a_key))
    });

    Ok(entries
        .into_iter()
        .take(limit)
        .map(|(_, entry)| entry)
        .collect())
}
