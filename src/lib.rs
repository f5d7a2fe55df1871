//! LRU/TTL Cache - a fixed-capacity in-process key/value cache
//!
//! Combines chained hash lookup, least-recently-used eviction under capacity
//! pressure and per-entry TTL expiry enforced by a background sweeper.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats, CacheStore, KeyLength, RandomSlots, SlotHasher};
pub use config::Config;
pub use error::{CacheError, Result};
