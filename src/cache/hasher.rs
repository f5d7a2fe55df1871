//! Slot hashing strategies.
//!
//! The store maps a key to a bucket with `hash_key(key) % slot_count`. Chains
//! absorb collisions, so any strategy is correct; better ones just keep
//! chains short.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

/// Maps a key to a 64-bit hash used for slot selection.
pub trait SlotHasher: Send + 'static {
    fn hash_key(&self, key: &str) -> u64;
}

/// Hashes a key by its byte length.
///
/// Every key of the same length lands in the same slot. Useful for forcing
/// chains in tests and for comparing against the length-keyed layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyLength;

impl SlotHasher for KeyLength {
    fn hash_key(&self, key: &str) -> u64 {
        key.len() as u64
    }
}

/// Randomly seeded SipHash, the default strategy.
#[derive(Debug, Clone, Default)]
pub struct RandomSlots(RandomState);

impl RandomSlots {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotHasher for RandomSlots {
    fn hash_key(&self, key: &str) -> u64 {
        self.0.hash_one(key)
    }
}
