//! JSON snapshot files
//!
//! The CLI works on a full database export: one JSON object whose top-level
//! keys are the collections. The file is read into a [`MemoryStore`] at
//! startup and written back after a mutating command.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::store::MemoryStore;
use crate::types::StoreError;

/// Errors reading or writing a snapshot file
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The file could not be read
    #[error("Failed to read snapshot '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid JSON
    #[error("Snapshot '{}' is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The store could not be encoded as JSON
    #[error("Failed to encode snapshot: {source}")]
    Encode { source: serde_json::Error },

    /// The file could not be written
    #[error("Failed to write snapshot '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The JSON is valid but not a database export
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load a snapshot file into a new in-memory store
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not JSON, or is not a
/// JSON object.
pub async fn load_snapshot(path: &Path) -> Result<MemoryStore, SnapshotError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let root: Value = serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot loaded");

    Ok(MemoryStore::from_snapshot(root)?)
}

/// Write the whole store to a snapshot file, pretty-printed
pub async fn save_snapshot(store: &MemoryStore, path: &Path) -> Result<(), SnapshotError> {
    let mut bytes = serde_json::to_vec_pretty(&store.snapshot())
        .map_err(|source| SnapshotError::Encode { source })?;
    bytes.push(b'\n');

    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| SnapshotError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), bytes = bytes.len(), "snapshot saved");
    Ok(())
}
