//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// A lookup miss is not an error: `get` reports it as `None`. Capacity
/// pressure is not an error either, eviction absorbs it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Rejected key or configuration value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation attempted after the cache was closed
    #[error("Cache is closed")]
    Closed,

    /// Internal failure, e.g. the expiry sweeper task panicked
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
