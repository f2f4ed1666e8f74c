//! The document store collaborator
//!
//! The point-of-sale core depends on exactly four primitives of the hosted
//! real-time database: read by path, write (set or field merge) by path,
//! append under a freshly generated key, and subscribe to a collection. Keys
//! are opaque strings and documents are JSON values.

use crate::types::StoreError;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Trait for the record-oriented document store
///
/// Paths are slash-separated (`products/<key>/quantity`). The first segment
/// names a top-level collection.
///
/// Implementations make no cross-path transactional guarantees: two writes
/// issued together may land independently of each other.
#[allow(async_fn_in_trait)]
pub trait DataStore: Send + Sync {
    /// Read the document at `path`, `None` when nothing is stored there
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the document at `path`; writing `null` removes it
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merge `fields` into the object at `path`, creating it if absent
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Generate a new, chronologically ordered key under `collection`
    ///
    /// Nothing is written; the key is reserved client-side only.
    fn push_key(&self, collection: &str) -> String;

    /// Append `value` under a fresh key and return that key
    async fn push(&self, collection: &str, value: Value) -> Result<String, StoreError> {
        let key = self.push_key(collection);
        self.set(&format!("{collection}/{key}"), value).await?;
        Ok(key)
    }

    /// Subscribe to full snapshots of a top-level collection
    ///
    /// The receiver yields the whole collection after every change.
    fn subscribe(&self, collection: &str) -> Result<watch::Receiver<Value>, StoreError>;
}

/// Split a store path into its segments
///
/// Leading and trailing slashes are ignored.
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for an empty path or an empty segment.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let trimmed = path.trim_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();
    if trimmed.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::InvalidPath {
            path: path.to_string(),
        });
    }
    Ok(segments)
}

/// Encode a record as the JSON document to be written at `path`
///
/// # Errors
///
/// Returns `StoreError::Encode` if the record cannot be represented as JSON.
pub fn to_document<T: Serialize>(path: &str, record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Encode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Iterate the children of a collection snapshot as `(key, document)` pairs
///
/// Anything other than an object yields no children.
pub fn children(snapshot: &Value) -> impl Iterator<Item = (&String, &Value)> {
    snapshot.as_object().into_iter().flat_map(|map| map.iter())
}
