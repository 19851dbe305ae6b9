//! Batch Snapshot Codec
//!
//! Serializable representation of a live batch for crash-safe backup. The
//! snapshot carries the batch's expiry, capacity and items; it is encoded to a
//! JSON string suitable for the durable key-value store and decoded back on
//! restore. Expiry travels as unix milliseconds so the wire format stays free
//! of datetime types.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::batch::Batch;

/// Errors raised by the snapshot codec
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode batch snapshot: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode batch snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Borrowing view of a live batch, serialized without copying its items
#[derive(Serialize)]
struct SnapshotRef<'a, T> {
    expires_at_ms: i64,
    capacity: usize,
    items: &'a [T],
}

/// Persisted form of a batch: `{expires_at_ms, capacity, items}`
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchSnapshot<T> {
    pub expires_at_ms: i64,
    pub capacity: usize,
    pub items: Vec<T>,
}

impl<T> BatchSnapshot<T> {
    /// Encode a live batch into the stored string form
    pub fn encode(batch: &Batch<T>) -> Result<String, SnapshotError>
    where
        T: Serialize,
    {
        let view = SnapshotRef {
            expires_at_ms: batch.expires_at().timestamp_millis(),
            capacity: batch.capacity(),
            items: batch.items(),
        };
        serde_json::to_string(&view).map_err(SnapshotError::Encode)
    }

    /// Decode a stored string back into a snapshot.
    ///
    /// A truncated or otherwise mangled value decodes to `Err`; restore treats
    /// that the same as having no prior state.
    pub fn decode(raw: &str) -> Result<Self, SnapshotError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(raw).map_err(SnapshotError::Decode)
    }

    /// Persisted expiry as a wall-clock time, when representable
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.expires_at_ms)
    }
}
