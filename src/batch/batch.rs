//! Event Batch Container
//!
//! A batch is an ordered buffer of event records with a soft capacity and an
//! absolute expiry time. The manager decides *when* a batch expires; the batch
//! itself only knows how to accumulate items and how to signal that it is done
//! exactly once.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Ordered, time-limited buffer of pending event records.
///
/// Capacity is a trigger, not a hard limit: an `add` that lands after the
/// capacity has been reached but before the next heartbeat still succeeds.
#[derive(Debug)]
pub struct Batch<T> {
    /// Soft ceiling on item count before the heartbeat forces expiry
    capacity: usize,
    /// Absolute expiry time, fixed at creation (creation time + timeout)
    expires_at: DateTime<Utc>,
    /// Buffered items in insertion order
    items: Vec<T>,
    /// Set once by `expire()`; never reset
    expired: bool,
}

impl<T> Batch<T> {
    /// Creates an empty batch that expires `timeout` from now
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        let millis = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(chrono::Duration::milliseconds(millis))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            capacity,
            expires_at,
            items: Vec::new(),
            expired: false,
        }
    }

    /// Append an item to the batch. Never fails, never blocks.
    pub fn add(&mut self, item: T) {
        self.items.push(item);
    }

    /// Whether the batch should expire as of `now`.
    ///
    /// True when the batch holds at least one item AND either the capacity has
    /// been reached or the expiry deadline has passed. A batch with zero items
    /// never expires on time alone.
    pub fn should_expire(&self, now: DateTime<Utc>) -> bool {
        !self.items.is_empty() && (self.items.len() >= self.capacity || now > self.expires_at)
    }

    /// Mark the batch as expired.
    ///
    /// Returns `true` the first time and `false` on every later call; a batch
    /// that already expired is left untouched so its items cannot be delivered
    /// twice. Items stay readable through `items()` until the batch is
    /// consumed.
    pub fn expire(&mut self) -> bool {
        if self.expired {
            return false;
        }
        self.expired = true;
        true
    }

    /// Consume the batch, yielding its items for delivery
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Buffered items, in insertion order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of buffered items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `expire()` has run
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Soft item-count ceiling
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Absolute expiry deadline
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
