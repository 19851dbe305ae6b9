//! Persistent Batch Manager Module
//!
//! This module wraps the batch lifecycle with crash-safe persistence. After
//! every mutation the live batch is marked dirty; the heartbeat task then
//! snapshots it to a durable key-value store, so a process crash loses at most
//! the events recorded since the last successful backup. On startup, before
//! the heartbeat begins, any previously backed-up batch is restored and its
//! items are replayed into a fresh in-memory batch.
//!
//! # Failure Policy
//! Storage and codec failures never reach the producer. A failed backup is
//! logged and the dirty flag stays set, so the next heartbeat retries without
//! waiting for another mutation. Corrupt or partially written state found at
//! restore time is logged and discarded; the engine starts empty.

use crate::batch::manager::{BatchSink, EngineState};
use crate::batch::snapshot::BatchSnapshot;
use crate::config::BatchSettings;
use crate::storage::StateStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Engine state plus the persistence bookkeeping that wraps it
struct PersistentState<T, S> {
    engine: EngineState<T>,
    /// Durable key-value store receiving batch snapshots
    store: S,
    /// Store key owned by this engine instance. Two live instances must never
    /// share a key.
    storage_key: String,
    /// Set on every add and rotation, cleared only after a successful backup
    dirty: bool,
    /// Restore runs once per instance, on the first `start()`
    restored: bool,
}

impl<T, S> PersistentState<T, S>
where
    T: Serialize + DeserializeOwned,
    S: StateStore,
{
    /// Snapshot the live batch into the store.
    ///
    /// Any error on this path is logged and swallowed; the engine keeps
    /// operating in memory and the dirty flag stays set so the next heartbeat
    /// retries the backup.
    async fn backup(&mut self) {
        let encoded = match BatchSnapshot::encode(&self.engine.batch) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!("Failed to encode batch snapshot: {}", e);
                return;
            }
        };

        match self.store.set(&self.storage_key, &encoded).await {
            Ok(()) => {
                self.dirty = false;
                debug!(
                    "Backed up {} buffered event(s) under '{}'",
                    self.engine.pending(),
                    self.storage_key
                );
            }
            Err(e) => {
                warn!(
                    "Failed to back up batch under '{}', will retry next heartbeat: {}",
                    self.storage_key, e
                );
            }
        }
    }

    /// Load a previously backed-up batch and replay its items.
    ///
    /// Replayed items go through `add` into the fresh live batch under the
    /// current settings, which re-dirties the state; the next heartbeat then
    /// rewrites an identical snapshot. Restoring and immediately crashing
    /// therefore reproduces the same stored value.
    async fn restore(&mut self) {
        let raw = match self.store.get(&self.storage_key).await {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => {
                // Never written (or written empty): clean start
                debug!("No backed-up batch under '{}'", self.storage_key);
                return;
            }
            Err(e) => {
                warn!(
                    "Failed to read backed-up batch under '{}': {}",
                    self.storage_key, e
                );
                return;
            }
        };

        match BatchSnapshot::<T>::decode(&raw) {
            Ok(snapshot) => {
                let count = snapshot.items.len();
                debug!(
                    "Backed-up batch had capacity {} and expiry {:?}",
                    snapshot.capacity,
                    snapshot.expires_at()
                );
                if count > 0 {
                    for item in snapshot.items {
                        self.engine.add(item);
                    }
                    self.dirty = true;
                }
                info!(
                    "Restored {} buffered event(s) from '{}'",
                    count, self.storage_key
                );
            }
            Err(e) => {
                warn!(
                    "Discarding corrupt batch backup under '{}': {}",
                    self.storage_key, e
                );
            }
        }
    }
}

/// Batch manager with crash-safe backup and restore
///
/// Behaves exactly like [`crate::BatchManager`] and additionally snapshots the
/// live batch to a [`StateStore`] whenever it has unpersisted mutations. The
/// item type must support serde round-trips so its records survive the trip
/// through the store's string format.
pub struct PersistentBatchManager<T, S> {
    state: Arc<Mutex<PersistentState<T, S>>>,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T, S> PersistentBatchManager<T, S>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    S: StateStore + 'static,
{
    /// Creates a new persistent batch manager
    ///
    /// # Arguments
    /// * `settings` - Capacity, timeout and heartbeat cadence
    /// * `store` - Durable key-value store receiving snapshots
    /// * `storage_key` - Store key owned by this instance
    /// * `sink` - Callback invoked with the items of every expired batch
    pub fn new(
        settings: &BatchSettings,
        store: S,
        storage_key: impl Into<String>,
        sink: impl FnMut(Vec<T>) + Send + 'static,
    ) -> Self {
        let sink: BatchSink<T> = Box::new(sink);
        Self {
            state: Arc::new(Mutex::new(PersistentState {
                engine: EngineState::new(settings, sink),
                store,
                storage_key: storage_key.into(),
                dirty: false,
                restored: false,
            })),
            heartbeat_task: Mutex::new(None),
        }
    }

    /// Restore any backed-up batch, then start the heartbeat task.
    ///
    /// Idempotent: a second call while the task is running is a no-op, and the
    /// restore pass runs at most once per instance. Each heartbeat cycle first
    /// runs the capacity/timeout evaluation, then backs up the live batch if
    /// it is dirty.
    pub async fn start(&self) {
        let mut task = self.heartbeat_task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Heartbeat already running");
            return;
        }

        {
            let mut state = self.state.lock().await;
            if !state.restored {
                state.restored = true;
                state.restore().await;
            }
        }

        let state = Arc::clone(&self.state);
        *task = Some(tokio::spawn(async move {
            loop {
                let interval = { state.lock().await.engine.heartbeat };
                tokio::time::sleep(interval).await;

                // The store write is a suspension point, but the lock spans
                // the whole tick: an add issued during a backup simply waits.
                let mut guard = state.lock().await;
                if guard.engine.check_expired() {
                    guard.dirty = true;
                }
                if guard.dirty {
                    guard.backup().await;
                }
            }
        }));
        info!("Persistent batch manager started");
    }

    /// Cancel the heartbeat task. Idempotent. Does not expire the live batch
    /// and does not write a final snapshot.
    pub async fn stop(&self) {
        if let Some(handle) = self.heartbeat_task.lock().await.take() {
            handle.abort();
            info!("Persistent batch manager stopped");
        }
    }

    /// Append an item to the live batch and mark the state dirty
    pub async fn add(&self, item: T) {
        let mut state = self.state.lock().await;
        state.engine.add(item);
        state.dirty = true;
    }

    /// Expire the live batch immediately and mark the state dirty, so the
    /// next heartbeat persists the rotated (now empty) batch in place of the
    /// delivered one.
    pub async fn flush(&self) {
        let mut state = self.state.lock().await;
        state.engine.flush();
        state.dirty = true;
    }

    /// Update the capacity used for future rotations
    pub async fn set_capacity(&self, capacity: usize) {
        self.state.lock().await.engine.capacity = capacity;
    }

    /// Update the timeout used for future rotations
    pub async fn set_timeout(&self, timeout: Duration) {
        self.state.lock().await.engine.timeout = timeout;
    }

    /// Update the heartbeat cadence. Applied at the start of the next cycle.
    pub async fn set_heartbeat(&self, heartbeat: Duration) {
        self.state.lock().await.engine.heartbeat = heartbeat;
    }

    /// Number of items currently buffered in the live batch
    pub async fn pending(&self) -> usize {
        self.state.lock().await.engine.pending()
    }
}
