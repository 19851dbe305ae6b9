//! Client-side telemetry event batching engine.
//! Buffers discrete event records into size/time-bounded batches, delivers
//! expired batches to a caller-supplied transport callback, and optionally
//! snapshots the live batch to durable storage so events survive a crash.

pub mod types; // Event record types and the context that stamps them.
pub mod batch; // Batch container, heartbeat manager and persistence layer.
pub mod storage; // Durable key-value store contract and implementations.
pub mod config; // Defines and loads engine configuration.

// Re-export commonly used types for easier access.
pub use batch::{Batch, BatchManager, BatchSnapshot, PersistentBatchManager};
pub use config::Config;
pub use storage::{MemoryStore, SqliteStore, StateStore, StoreError};
pub use types::{EventContext, EventFactory, TelemetryEvent};
