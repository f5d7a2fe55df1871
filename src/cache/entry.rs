//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single stored record.
///
/// Entries are owned by the store's arena and never handed out; callers only
/// ever receive clones of the value.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The key, immutable once created
    pub key: String,
    /// The stored value
    pub value: V,
    /// Recency stamp, refreshed on every access
    pub recency: u64,
    /// Absolute expiry deadline, None = no expiration
    pub deadline: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Time to live, `Duration::ZERO` means the entry never expires
    /// * `recency` - Initial recency stamp
    /// * `now` - Reference time the deadline is computed from
    pub fn new(key: String, value: V, ttl: Duration, recency: u64, now: Instant) -> Self {
        Self {
            key,
            value,
            recency,
            deadline: deadline_from(ttl, now),
        }
    }

    // == Refresh ==
    /// Overwrites the value and recomputes the deadline in place.
    pub fn refresh(&mut self, value: V, ttl: Duration, recency: u64, now: Instant) {
        self.value = value;
        self.deadline = deadline_from(ttl, now);
        self.recency = recency;
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once `now` reaches the deadline,
    /// so a TTL of T is unreadable at exactly T.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

/// A zero TTL means "never expires". A TTL too large to represent is treated
/// the same way.
fn deadline_from(ttl: Duration, now: Instant) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        now.checked_add(ttl)
    }
}
