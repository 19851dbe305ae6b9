//! Batch Manager Module
//!
//! This module implements the lifecycle layer that owns the live batch. It
//! runs a background heartbeat loop that periodically evaluates the batch's
//! capacity and timeout, rotates to a fresh batch when the live one expires,
//! and hands the expired item list to a caller-supplied sink.
//!
//! # Architecture Flow
//! 1. Producers call `add` and items accumulate in the live batch
//! 2. The heartbeat task wakes every `heartbeat` interval
//! 3. If the live batch reached its capacity or its deadline, rotate:
//!    swap in a fresh batch built from the current settings, mark the old
//!    one expired, then invoke the sink with its items
//! 4. `flush` forces the same rotation on demand, ignoring the triggers

use crate::batch::Batch;
use crate::config::BatchSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Caller-supplied delivery callback, invoked with the full item list of every
/// expired batch. The engine does not retry and never learns whether the
/// delivery succeeded.
pub type BatchSink<T> = Box<dyn FnMut(Vec<T>) + Send + 'static>;

/// Mutable engine state shared between the public API and the heartbeat task.
///
/// All mutation happens under one lock, so there is exactly one writer to the
/// live batch at any instant: producers, the heartbeat and the sink never
/// observe a partially rotated batch.
pub(crate) struct EngineState<T> {
    /// The single live batch accepting new items
    pub(crate) batch: Batch<T>,
    /// Capacity applied to future rotations
    pub(crate) capacity: usize,
    /// Timeout applied to future rotations
    pub(crate) timeout: Duration,
    /// Heartbeat cadence, re-read by the task at the top of every cycle
    pub(crate) heartbeat: Duration,
    /// Delivery callback for expired batches
    sink: BatchSink<T>,
    /// Count of batches delivered so far, used for logging
    delivered: u64,
}

impl<T> EngineState<T> {
    pub(crate) fn new(settings: &BatchSettings, sink: BatchSink<T>) -> Self {
        let capacity = settings.capacity;
        let timeout = settings.timeout();
        Self {
            batch: Batch::new(capacity, timeout),
            capacity,
            timeout,
            heartbeat: settings.heartbeat(),
            sink,
            delivered: 0,
        }
    }

    pub(crate) fn add(&mut self, item: T) {
        self.batch.add(item);
    }

    /// Heartbeat evaluation: rotate if the live batch reached its capacity or
    /// its deadline. Returns `true` when a rotation happened.
    pub(crate) fn check_expired(&mut self) -> bool {
        if self.batch.should_expire(chrono::Utc::now()) {
            self.rotate();
            true
        } else {
            false
        }
    }

    /// Force expiry of the live batch regardless of count or elapsed time
    pub(crate) fn flush(&mut self) {
        self.rotate();
    }

    /// Replace the live batch with a fresh one and deliver the old batch's
    /// items to the sink.
    ///
    /// The swap happens before the sink runs, so an item added while a
    /// delivery is in flight always lands in the new batch and never leaks
    /// into the payload already handed out.
    fn rotate(&mut self) {
        // Step 1: construct the replacement from the current settings
        let fresh = Batch::new(self.capacity, self.timeout);
        let mut retired = std::mem::replace(&mut self.batch, fresh);

        // Step 2: mark the retired batch expired. A batch that somehow
        // already expired is skipped so its items cannot go out twice.
        if !retired.expire() {
            return;
        }

        // Step 3: hand the full item list to the sink
        self.delivered += 1;
        let items = retired.into_items();
        info!("Batch #{} expired with {} event(s)", self.delivered, items.len());
        (self.sink)(items);
    }

    pub(crate) fn pending(&self) -> usize {
        self.batch.len()
    }
}

/// Batch lifecycle manager
///
/// Owns exactly one live batch at a time and the heartbeat task that decides
/// when it expires. The sink is injected at construction; there is no global
/// registration point.
pub struct BatchManager<T> {
    state: Arc<Mutex<EngineState<T>>>,
    heartbeat_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> BatchManager<T> {
    /// Creates a new batch manager
    ///
    /// # Arguments
    /// * `settings` - Capacity, timeout and heartbeat cadence
    /// * `sink` - Callback invoked with the items of every expired batch
    pub fn new(settings: &BatchSettings, sink: impl FnMut(Vec<T>) + Send + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::new(settings, Box::new(sink)))),
            heartbeat_task: Mutex::new(None),
        }
    }

    /// Start the heartbeat task. Idempotent: calling this while the task is
    /// already running is a no-op.
    ///
    /// The cadence is re-read from shared state at the top of every cycle, so
    /// `set_heartbeat` takes effect at the next tick without the task ever
    /// being restarted.
    pub async fn start(&self) {
        let mut task = self.heartbeat_task.lock().await;
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Heartbeat already running");
            return;
        }

        let state = Arc::clone(&self.state);
        *task = Some(tokio::spawn(async move {
            loop {
                let interval = { state.lock().await.heartbeat };
                tokio::time::sleep(interval).await;
                state.lock().await.check_expired();
            }
        }));
        info!("Batch manager started");
    }

    /// Cancel the heartbeat task. Idempotent. Does not expire the live batch
    /// and does not roll back the effects of a tick already in progress.
    pub async fn stop(&self) {
        if let Some(handle) = self.heartbeat_task.lock().await.take() {
            handle.abort();
            info!("Batch manager stopped");
        }
    }

    /// Append an item to the live batch. Never fails; the only way to lose an
    /// event is process death before the batch expires.
    pub async fn add(&self, item: T) {
        self.state.lock().await.add(item);
    }

    /// Expire the live batch immediately, regardless of its count or elapsed
    /// time. A fresh batch is ready to accept items as soon as this returns.
    pub async fn flush(&self) {
        self.state.lock().await.flush();
    }

    /// Update the capacity used for future rotations. The live batch keeps
    /// the capacity it was created with.
    pub async fn set_capacity(&self, capacity: usize) {
        self.state.lock().await.capacity = capacity;
    }

    /// Update the timeout used for future rotations. The live batch keeps its
    /// original expiry deadline.
    pub async fn set_timeout(&self, timeout: Duration) {
        self.state.lock().await.timeout = timeout;
    }

    /// Update the heartbeat cadence. Applied at the start of the next cycle.
    pub async fn set_heartbeat(&self, heartbeat: Duration) {
        self.state.lock().await.heartbeat = heartbeat;
    }

    /// Number of items currently buffered in the live batch
    pub async fn pending(&self) -> usize {
        self.state.lock().await.pending()
    }
}
