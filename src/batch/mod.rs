//! Event Batching Module
//!
//! This module implements the event batching engine:
//! - Batch: ordered, time-limited buffer of pending event records
//! - BatchManager: owns the live batch, runs the heartbeat, rotates on expiry
//! - PersistentBatchManager: adds crash-safe backup/restore through a store
//! - BatchSnapshot: the serialized form a batch takes in durable storage

mod batch;
mod manager;
mod persistent;
mod snapshot;


pub use batch::Batch;
pub use manager::{BatchManager, BatchSink};
pub use persistent::PersistentBatchManager;
pub use snapshot::{BatchSnapshot, SnapshotError};
