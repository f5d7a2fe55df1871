//! LRU Module
//!
//! Recency clock and the eviction selector.
//!
//! Every access stamps the touched entry with the next clock value, so the
//! entry holding the smallest stamp is the least recently used one.

use crate::cache::CacheEntry;

// == Recency Clock ==
/// Strictly increasing logical clock owned by a single store.
#[derive(Debug, Default)]
pub(crate) struct RecencyClock {
    current: u64,
}

impl RecencyClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // == Tick ==
    /// Advances the clock and returns the new stamp.
    pub(crate) fn tick(&mut self) -> u64 {
        self.current += 1;
        self.current
    }
}

// == Victim Position ==
/// Location of an entry inside the bucket array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Bucket index
    pub slot: usize,
    /// Index within the bucket chain
    pub link: usize,
}

// == Least Recent ==
/// Finds the entry with the globally minimum recency stamp.
///
/// Walks every slot in ascending order and every chain front to back. The
/// candidate is replaced only on a strictly smaller stamp, so a tie would
/// resolve to the lowest slot and earliest link. Returns None when the store
/// holds no entries.
///
/// This is a full O(capacity) scan.
pub fn least_recent<V>(buckets: &[Vec<usize>], arena: &[Option<CacheEntry<V>>]) -> Option<Position> {
    let mut victim: Option<(u64, Position)> = None;

    for (slot, chain) in buckets.iter().enumerate() {
        for (link, &index) in chain.iter().enumerate() {
            let Some(entry) = arena.get(index).and_then(Option::as_ref) else {
                continue;
            };
            let older = match victim {
                Some((recency, _)) => entry.recency < recency,
                None => true,
            };
            if older {
                victim = Some((entry.recency, Position { slot, link }));
            }
        }
    }

    victim.map(|(_, position)| position)
}
