//! In-process document store
//!
//! `MemoryStore` stands in for the hosted real-time database. It keeps one
//! JSON tree per top-level collection and publishes every change through a
//! `tokio::sync::watch` channel, so subscribers always observe a complete
//! replacement snapshot of the collection.
//!
//! # Thread Safety
//!
//! Collections are kept in a `DashMap`; a write to one collection holds only
//! that collection's shard lock while the tree is modified. There is still no
//! transaction spanning several paths, matching the hosted store.
//!
//! # Failure Injection
//!
//! Writes below a registered path prefix can be made to fail with
//! [`MemoryStore::fail_writes`], which is how partially failing purchase
//! commits are reproduced. [`MemoryStore::fail_reads`] does the same for
//! reads.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::debug;

use super::traits::{split_path, DataStore};
use crate::types::StoreError;

/// In-memory implementation of [`DataStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// One watch channel per collection; the sender owns the current tree
    collections: DashMap<String, watch::Sender<Value>>,

    /// Path prefix -> failure message for injected write failures
    failing_writes: DashMap<String, String>,

    /// Path prefix -> failure message for injected read failures
    failing_reads: DashMap<String, String>,

    /// Disambiguates keys generated within the same millisecond
    key_counter: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from a full database export
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotAnObject` if `root` is not a JSON object.
    pub fn from_snapshot(root: Value) -> Result<Self, StoreError> {
        let Value::Object(collections) = root else {
            return Err(StoreError::NotAnObject {
                path: "/".to_string(),
            });
        };

        let store = Self::new();
        for (name, tree) in collections {
            let (sender, _) = watch::channel(tree);
            store.collections.insert(name, sender);
        }
        Ok(store)
    }

    /// Export every non-empty collection as one JSON object
    pub fn snapshot(&self) -> Value {
        let mut root = Map::new();
        for entry in self.collections.iter() {
            let tree = entry.value().borrow().clone();
            if !tree.is_null() {
                root.insert(entry.key().clone(), tree);
            }
        }
        Value::Object(root)
    }

    /// Make every write at or below `prefix` fail with `message`
    pub fn fail_writes(&self, prefix: &str, message: &str) {
        self.failing_writes
            .insert(prefix.trim_matches('/').to_string(), message.to_string());
    }

    /// Make every read at or below `prefix` fail with `message`
    pub fn fail_reads(&self, prefix: &str, message: &str) {
        self.failing_reads
            .insert(prefix.trim_matches('/').to_string(), message.to_string());
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.failing_writes.clear();
        self.failing_reads.clear();
    }

    fn check_writable(&self, path: &str) -> Result<(), StoreError> {
        injected_failure(&self.failing_writes, path)
    }

    fn check_readable(&self, path: &str) -> Result<(), StoreError> {
        injected_failure(&self.failing_reads, path)
    }

    /// Apply `f` to the tree of `collection`, notifying subscribers
    fn modify<F>(&self, collection: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Value) -> Result<(), StoreError>,
    {
        let sender = self
            .collections
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(Value::Null).0);

        let mut result = Ok(());
        sender.send_modify(|tree| result = f(tree));
        result
    }
}

/// Fail if `path` is at or below one of the registered prefixes
fn injected_failure(failures: &DashMap<String, String>, path: &str) -> Result<(), StoreError> {
    let path = path.trim_matches('/');
    for entry in failures.iter() {
        let prefix = entry.key();
        let matches = path == prefix
            || (path.starts_with(prefix.as_str())
                && path.as_bytes().get(prefix.len()) == Some(&b'/'));
        if matches {
            return Err(StoreError::Unavailable {
                path: path.to_string(),
                message: entry.value().clone(),
            });
        }
    }
    Ok(())
}

/// Walk down `segments` from `node`, returning the value found there
fn lookup<'a>(mut node: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    for segment in segments {
        node = node.as_object()?.get(*segment)?;
    }
    Some(node)
}

/// Write `value` at `segments` below `node`, creating objects on the way
///
/// A `null` value removes the leaf instead.
fn write_at(node: &mut Value, segments: &[&str], value: Value) {
    let Some((leaf, parents)) = segments.split_last() else {
        *node = value;
        return;
    };

    let mut current = node;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if value.is_null() {
        if let Some(map) = current.as_object_mut() {
            map.remove(*leaf);
        }
        return;
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(leaf.to_string(), value);
    }
}

impl DataStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        let segments = split_path(path)?;
        self.check_readable(path)?;
        let Some((collection, rest)) = segments.split_first() else {
            return Ok(None);
        };
        let Some(sender) = self.collections.get(*collection) else {
            return Ok(None);
        };
        let tree = sender.borrow();
        Ok(lookup(&tree, rest).filter(|v| !v.is_null()).cloned())
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        self.check_writable(path)?;
        debug!(path, "set");

        let (collection, rest) = segments
            .split_first()
            .ok_or_else(|| StoreError::InvalidPath {
                path: path.to_string(),
            })?;
        self.modify(collection, |tree| {
            write_at(tree, rest, value);
            Ok(())
        })
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        self.check_writable(path)?;
        debug!(path, fields = fields.len(), "update");

        let (collection, rest) = segments
            .split_first()
            .ok_or_else(|| StoreError::InvalidPath {
                path: path.to_string(),
            })?;
        self.modify(collection, |tree| {
            let target = match lookup(tree, rest) {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(map)) => map.clone(),
                Some(_) => {
                    return Err(StoreError::NotAnObject {
                        path: path.to_string(),
                    })
                }
            };

            let mut merged = target;
            for (field, value) in fields {
                if value.is_null() {
                    merged.remove(&field);
                } else {
                    merged.insert(field, value);
                }
            }
            write_at(tree, rest, Value::Object(merged));
            Ok(())
        })
    }

    fn push_key(&self, _collection: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let counter = self.key_counter.fetch_add(1, Ordering::SeqCst);
        format!("-{millis:012x}{counter:08x}")
    }

    fn subscribe(&self, collection: &str) -> Result<watch::Receiver<Value>, StoreError> {
        let segments = split_path(collection)?;
        if segments.len() != 1 {
            return Err(StoreError::InvalidPath {
                path: collection.to_string(),
            });
        }
        let sender = self
            .collections
            .entry(segments[0].to_string())
            .or_insert_with(|| watch::channel(Value::Null).0);
        Ok(sender.subscribe())
    }
}
