//! Cache Store Module
//!
//! Fixed-size bucket array with chained collision resolution, LRU eviction
//! and TTL bookkeeping.
//!
//! Entries live in an arena addressed by index and each bucket chain is a
//! list of arena indices. Removing an entry unlinks its index from the chain
//! and returns the arena cell to a free list, so no entry is ever reachable
//! from two places.
//!
//! The store is not synchronized. [`Cache`](crate::cache::Cache) owns it
//! behind a single lock and is the only way to reach it concurrently.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::lru::{self, Position, RecencyClock};
use crate::cache::{CacheEntry, CacheStats, RandomSlots, SlotHasher, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Capacity-bounded key/value storage.
///
/// The bucket count equals the capacity, giving an average chain length of
/// one under a uniform hash.
#[derive(Debug)]
pub struct CacheStore<V, H = RandomSlots> {
    /// Entry arena, `None` cells are listed in `vacant`
    arena: Vec<Option<CacheEntry<V>>>,
    /// Reusable arena cells
    vacant: Vec<usize>,
    /// Bucket chains of arena indices, in insertion order
    buckets: Vec<Vec<usize>>,
    hasher: H,
    clock: RecencyClock,
    stats: CacheStats,
    /// Number of live entries
    len: usize,
}

impl<V: Clone> CacheStore<V, RandomSlots> {
    // == Constructor ==
    /// Creates a store with the default hash strategy.
    ///
    /// Fails with `InvalidInput` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_hasher(capacity, RandomSlots::new())
    }
}

impl<V: Clone, H: SlotHasher> CacheStore<V, H> {
    /// Creates a store that places keys with `hasher`.
    pub fn with_hasher(capacity: usize, hasher: H) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidInput(
                "capacity must be a positive integer".to_string(),
            ));
        }

        Ok(Self {
            arena: Vec::with_capacity(capacity),
            vacant: Vec::new(),
            buckets: vec![Vec::new(); capacity],
            hasher,
            clock: RecencyClock::new(),
            stats: CacheStats::new(capacity),
            len: 0,
        })
    }

    // == Set ==
    /// Stores a key-value pair.
    ///
    /// An existing key is refreshed in place (value, deadline and recency).
    /// A new key at full capacity first drops expired entries and, if that
    /// frees nothing, evicts the least recently used entry, so this never
    /// fails for lack of room.
    ///
    /// # Arguments
    /// * `key` - Non-empty key of at most `MAX_KEY_LENGTH` bytes
    /// * `value` - The value to store
    /// * `ttl` - Time to live, `Duration::ZERO` means no expiration
    /// * `now` - Current time, used to compute the deadline
    pub fn set(&mut self, key: String, value: V, ttl: Duration, now: Instant) -> Result<()> {
        validate_key(&key)?;

        if let Some((_, index)) = self.locate(&key) {
            let recency = self.clock.tick();
            if let Some(entry) = self.arena[index].as_mut() {
                entry.refresh(value, ttl, recency, now);
                return Ok(());
            }
        }

        let slot = self.slot_of(&key);
        let recency = self.clock.tick();
        let entry = CacheEntry::new(key, value, ttl, recency, now);

        // Dead entries go before any live one is evicted.
        if self.len >= self.capacity() {
            self.purge_expired(now);
        }

        if self.len >= self.capacity() {
            if let Some(victim) = lru::least_recent(&self.buckets, &self.arena) {
                self.stats.record_eviction();

                // Same bucket: the new entry takes over the victim's link.
                if victim.slot == slot {
                    let index = self.buckets[slot][victim.link];
                    if let Some(evicted) = self.arena[index].replace(entry) {
                        debug!("Evicted least recently used key {}", evicted.key);
                    }
                    return Ok(());
                }

                if let Some(evicted) = self.unlink(victim) {
                    debug!("Evicted least recently used key {}", evicted.key);
                }
            }
        }

        self.link(slot, entry);
        self.stats.set_total_entries(self.len);
        Ok(())
    }

    // == Get ==
    /// Retrieves a clone of the value stored under `key`.
    ///
    /// A hit refreshes the entry's recency. An entry whose deadline has passed
    /// is removed on the spot and reported as a miss.
    pub fn get(&mut self, key: &str, now: Instant) -> Option<V> {
        let Some((position, index)) = self.locate(key) else {
            self.stats.record_miss();
            return None;
        };

        let expired = self.arena[index]
            .as_ref()
            .is_some_and(|entry| entry.is_expired(now));
        if expired {
            if let Some(entry) = self.unlink(position) {
                debug!("Key {} expired before read", entry.key);
            }
            self.stats.record_expirations(1);
            self.stats.record_miss();
            self.stats.set_total_entries(self.len);
            return None;
        }

        let recency = self.clock.tick();
        let entry = self.arena[index].as_mut()?;
        entry.recency = recency;
        let value = entry.value.clone();
        self.stats.record_hit();
        Some(value)
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// Returns whether an entry was removed. Deleting an absent key is a no-op.
    pub fn delete(&mut self, key: &str) -> bool {
        let Some((position, _)) = self.locate(key) else {
            return false;
        };

        let removed = self.unlink(position).is_some();
        if removed {
            debug!("Deleted key {}", key);
            self.stats.set_total_entries(self.len);
        }
        removed
    }

    // == Purge Expired ==
    /// Removes every expired entry from every chain.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;

        for slot in 0..self.buckets.len() {
            let mut link = 0;
            while link < self.buckets[slot].len() {
                let index = self.buckets[slot][link];
                let expired = self.arena[index]
                    .as_ref()
                    .is_some_and(|entry| entry.is_expired(now));

                if !expired {
                    link += 1;
                    continue;
                }
                // Unlinking shifts the rest of the chain down, so `link`
                // already points at the next entry.
                if let Some(entry) = self.unlink(Position { slot, link }) {
                    debug!("Key {} expired", entry.key);
                    removed += 1;
                }
            }
        }

        self.stats.record_expirations(removed);
        self.stats.set_total_entries(self.len);
        removed
    }

    // == Contains ==
    /// Checks for a live entry without touching its recency.
    pub fn contains(&self, key: &str, now: Instant) -> bool {
        self.locate(key)
            .and_then(|(_, index)| self.arena[index].as_ref())
            .is_some_and(|entry| !entry.is_expired(now))
    }

    // == Stats ==
    /// Returns a snapshot of the store counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.len);
        stats
    }

    /// Returns the current number of entries, expired-but-unswept included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of entries, equal to the bucket count.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn slot_of(&self, key: &str) -> usize {
        (self.hasher.hash_key(key) % self.buckets.len() as u64) as usize
    }

    /// Finds `key` in its chain, returning its position and arena index.
    fn locate(&self, key: &str) -> Option<(Position, usize)> {
        let slot = self.slot_of(key);
        self.buckets[slot]
            .iter()
            .enumerate()
            .find(|&(_, &index)| {
                self.arena[index]
                    .as_ref()
                    .is_some_and(|entry| entry.key == key)
            })
            .map(|(link, &index)| (Position { slot, link }, index))
    }

    /// Appends an entry at the tail of `slot`'s chain.
    fn link(&mut self, slot: usize, entry: CacheEntry<V>) {
        let index = match self.vacant.pop() {
            Some(index) => {
                self.arena[index] = Some(entry);
                index
            }
            None => {
                self.arena.push(Some(entry));
                self.arena.len() - 1
            }
        };
        self.buckets[slot].push(index);
        self.len += 1;
    }

    /// Removes the entry at `position`. Every removal goes through here.
    fn unlink(&mut self, position: Position) -> Option<CacheEntry<V>> {
        let index = self.buckets[position.slot].remove(position.link);
        let entry = self.arena[index].take();
        self.vacant.push(index);
        if entry.is_some() {
            self.len -= 1;
        }
        entry
    }
}

// == Key Validation ==
fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidInput("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidInput(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::KeyLength;

    const NO_TTL: Duration = Duration::ZERO;

    fn store(capacity: usize) -> CacheStore<String> {
        CacheStore::new(capacity).unwrap()
    }

    fn colliding_store(capacity: usize) -> CacheStore<String, KeyLength> {
        CacheStore::with_hasher(capacity, KeyLength).unwrap()
    }

    fn set(store: &mut CacheStore<String, impl SlotHasher>, key: &str, value: &str, now: Instant) {
        store.set(key.to_string(), value.to_string(), NO_TTL, now).unwrap();
    }

    #[test]
    fn test_store_new() {
        let store = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_rejects_zero_capacity() {
        let result = CacheStore::<String>::new(0);
        assert!(matches!(result, Err(CacheError::InvalidInput(_))));
    }

    #[test]
    fn test_store_set_and_get() {
        let now = Instant::now();
        let mut store = store(100);

        set(&mut store, "key1", "value1", now);

        assert_eq!(store.get("key1", now), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = store(100);
        assert_eq!(store.get("nonexistent", Instant::now()), None);
    }

    #[test]
    fn test_store_rejects_empty_key() {
        let mut store = store(4);
        let result = store.set(String::new(), "v".to_string(), NO_TTL, Instant::now());

        assert!(matches!(result, Err(CacheError::InvalidInput(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_key_too_long() {
        let mut store = store(4);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let result = store.set(long_key, "value".to_string(), NO_TTL, Instant::now());
        assert!(matches!(result, Err(CacheError::InvalidInput(_))));
    }

    #[test]
    fn test_store_delete() {
        let now = Instant::now();
        let mut store = store(100);

        set(&mut store, "key1", "value1", now);

        assert!(store.delete("key1"));
        assert!(store.is_empty());
        assert_eq!(store.get("key1", now), None);
    }

    #[test]
    fn test_store_delete_nonexistent_is_noop() {
        let now = Instant::now();
        let mut store = store(4);
        set(&mut store, "key1", "value1", now);

        assert!(!store.delete("missing"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("key1", now), Some("value1".to_string()));
    }

    #[test]
    fn test_store_overwrite() {
        let now = Instant::now();
        let mut store = store(100);

        set(&mut store, "key1", "value1", now);
        set(&mut store, "key1", "value2", now);

        assert_eq!(store.get("key1", now), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_overwrite_at_capacity_does_not_evict() {
        let now = Instant::now();
        let mut store = store(2);

        set(&mut store, "a", "1", now);
        set(&mut store, "b", "2", now);
        set(&mut store, "a", "3", now);

        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.get("a", now), Some("3".to_string()));
        assert_eq!(store.get("b", now), Some("2".to_string()));
    }

    #[test]
    fn test_store_overwrite_resets_ttl() {
        let now = Instant::now();
        let mut store = store(4);

        store
            .set("k".to_string(), "v1".to_string(), Duration::from_secs(1), now)
            .unwrap();
        set(&mut store, "k", "v2", now);

        let later = now + Duration::from_secs(5);
        assert_eq!(store.get("k", later), Some("v2".to_string()));
    }

    #[test]
    fn test_store_ttl_expiration() {
        let now = Instant::now();
        let mut store = store(100);

        store
            .set("key1".to_string(), "value1".to_string(), Duration::from_secs(1), now)
            .unwrap();

        assert!(store.get("key1", now + Duration::from_millis(999)).is_some());
        assert_eq!(store.get("key1", now + Duration::from_secs(1)), None);

        // Lazy expiry removed the entry.
        assert!(store.is_empty());
        let stats = store.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_store_lru_eviction() {
        let now = Instant::now();
        let mut store = store(3);

        set(&mut store, "key1", "value1", now);
        set(&mut store, "key2", "value2", now);
        set(&mut store, "key3", "value3", now);

        // Cache is full, adding key4 should evict key1 (oldest)
        set(&mut store, "key4", "value4", now);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1", now), None);
        assert!(store.get("key2", now).is_some());
        assert!(store.get("key3", now).is_some());
        assert!(store.get("key4", now).is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let now = Instant::now();
        let mut store = store(3);

        set(&mut store, "key1", "value1", now);
        set(&mut store, "key2", "value2", now);
        set(&mut store, "key3", "value3", now);

        // Access key1 to make it most recently used
        store.get("key1", now).unwrap();

        // Adding key4 should evict key2 (now oldest)
        set(&mut store, "key4", "value4", now);

        assert!(store.get("key1", now).is_some());
        assert_eq!(store.get("key2", now), None);
    }

    #[test]
    fn test_store_eviction_within_same_chain_reuses_link() {
        let now = Instant::now();
        // Every four-byte key hashes to the same slot.
        let mut store = colliding_store(3);

        set(&mut store, "aaaa", "1", now);
        set(&mut store, "bbbb", "2", now);
        set(&mut store, "cccc", "3", now);
        set(&mut store, "dddd", "4", now);

        let slot = store.slot_of("dddd");
        let chain: Vec<&str> = store.buckets[slot]
            .iter()
            .filter_map(|&index| store.arena[index].as_ref())
            .map(|entry| entry.key.as_str())
            .collect();
        assert_eq!(chain, vec!["dddd", "bbbb", "cccc"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_store_eviction_across_chains_moves_entry() {
        let now = Instant::now();
        let mut store = colliding_store(4);

        set(&mut store, "a", "1", now);
        set(&mut store, "bb", "2", now);
        set(&mut store, "cc", "3", now);
        set(&mut store, "ddd", "4", now);
        set(&mut store, "eeee", "5", now);

        assert_eq!(store.get("a", now), None);
        assert_eq!(store.buckets[store.slot_of("a")].len(), 0);
        assert_eq!(store.get("eeee", now), Some("5".to_string()));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_store_full_prefers_expired_over_live_eviction() {
        let now = Instant::now();
        let mut store = store(2);

        set(&mut store, "live", "1", now);
        store
            .set("dead".to_string(), "2".to_string(), Duration::from_millis(1), now)
            .unwrap();

        let later = now + Duration::from_secs(1);
        set(&mut store, "new", "3", later);

        assert_eq!(store.get("live", later), Some("1".to_string()));
        assert_eq!(store.get("new", later), Some("3".to_string()));
        assert!(!store.contains("dead", later));
        assert_eq!(store.len(), 2);

        let stats = store.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_store_collisions_are_independent() {
        let now = Instant::now();
        let mut store = colliding_store(8);

        set(&mut store, "john0", "doe0", now);
        set(&mut store, "jane1", "doe1", now);

        assert_eq!(store.get("john0", now), Some("doe0".to_string()));
        assert_eq!(store.get("jane1", now), Some("doe1".to_string()));

        assert!(store.delete("john0"));
        assert_eq!(store.get("john0", now), None);
        assert_eq!(store.get("jane1", now), Some("doe1".to_string()));
    }

    #[test]
    fn test_store_purge_scans_full_chains() {
        let now = Instant::now();
        let mut store = colliding_store(8);

        // Head of the chain never expires, the entries behind it do.
        set(&mut store, "k000", "head", now);
        store
            .set("k001".to_string(), "v".to_string(), Duration::from_secs(1), now)
            .unwrap();
        store
            .set("k002".to_string(), "v".to_string(), Duration::from_secs(1), now)
            .unwrap();
        store
            .set("k003".to_string(), "v".to_string(), Duration::from_secs(60), now)
            .unwrap();

        let removed = store.purge_expired(now + Duration::from_secs(2));

        assert_eq!(removed, 2);
        assert_eq!(store.len(), 2);
        assert!(store.contains("k000", now));
        assert!(store.contains("k003", now));
        assert_eq!(store.stats().expirations, 2);
    }

    #[test]
    fn test_store_reuses_vacant_cells() {
        let now = Instant::now();
        let mut store = store(2);

        for round in 0..10 {
            set(&mut store, &format!("key{round}"), "v", now);
        }

        assert!(store.arena.len() <= 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_contains_does_not_touch_recency() {
        let now = Instant::now();
        let mut store = store(2);

        set(&mut store, "a", "1", now);
        set(&mut store, "b", "2", now);
        assert!(store.contains("a", now));
        set(&mut store, "c", "3", now);

        assert!(!store.contains("a", now));
        assert!(store.contains("b", now));
    }

    #[test]
    fn test_store_stats() {
        let now = Instant::now();
        let mut store = store(100);

        set(&mut store, "key1", "value1", now);
        store.get("key1", now).unwrap(); // hit
        let _ = store.get("nonexistent", now); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.capacity, 100);
    }
}
