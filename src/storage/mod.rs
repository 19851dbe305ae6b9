//! Durable Storage Module
//!
//! This module defines the key-value store contract used for crash-safe batch
//! backup, plus two implementations:
//! - SqliteStore: SQLite-backed store for production use
//! - MemoryStore: in-memory store for tests and database-free embedding

mod sqlite;
mod store;

pub use sqlite::SqliteStore;
pub use store::{MemoryStore, StateStore, StoreError};
