//! Cache facade.
//!
//! [`Cache`] owns the store behind one exclusive lock and runs the expiry
//! sweeper for as long as the cache is open. Every operation, including
//! `get` (which stamps recency), takes the lock, so an evicted or expired
//! entry can never be observed once its removal has happened.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{CacheStats, CacheStore, RandomSlots, SlotHasher};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_sweeper;

/// Fixed-capacity cache with LRU eviction and TTL expiry.
///
/// Share it between tasks with an [`Arc`]. It must be created from within a
/// Tokio runtime because the expiry sweeper runs as a Tokio task.
///
/// ```ignore
/// let cache: Cache<String> = Cache::new(100)?;
/// cache.set("user:1", "alice".to_string(), Duration::from_secs(30)).await?;
/// assert_eq!(cache.get("user:1").await?, Some("alice".to_string()));
/// cache.close().await?;
/// ```
#[derive(Debug)]
pub struct Cache<V, H = RandomSlots> {
    store: Arc<Mutex<CacheStore<V, H>>>,
    /// `true` once the cache is closed; also the sweeper's stop signal
    shutdown: watch::Sender<bool>,
    /// Taken by the first `close`
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> Cache<V, RandomSlots>
where
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries, using default
    /// settings for everything else.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::from_config(&Config::default().with_capacity(capacity))
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_hasher(config, RandomSlots::new())
    }
}

impl<V, H> Cache<V, H>
where
    V: Clone + Send + 'static,
    H: SlotHasher,
{
    /// Creates a cache that places keys with `hasher`.
    ///
    /// Fails with `InvalidInput` on an invalid config and with `Internal` when
    /// called outside a Tokio runtime.
    pub fn with_hasher(config: &Config, hasher: H) -> Result<Self> {
        config.validate()?;
        Handle::try_current().map_err(|err| {
            CacheError::Internal(format!("cache requires a Tokio runtime: {err}"))
        })?;

        let store = Arc::new(Mutex::new(CacheStore::with_hasher(config.capacity, hasher)?));
        let (shutdown, stopped) = watch::channel(false);
        let sweeper = spawn_sweeper(store.clone(), config.sweep_interval(), stopped);

        info!(
            "Cache created: capacity={}, sweep_interval={}ms",
            config.capacity, config.sweep_interval_ms
        );

        Ok(Self {
            store,
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// A `ttl` of `Duration::ZERO` means the entry never expires. Capacity
    /// pressure evicts the least recently used entry instead of failing.
    pub async fn set(&self, key: impl Into<String>, value: V, ttl: Duration) -> Result<()> {
        self.ensure_open()?;
        let mut store = self.store.lock().await;
        store.set(key.into(), value, ttl, Instant::now())
    }

    // == Get ==
    /// Looks up `key`, counting a hit as a use for LRU purposes.
    ///
    /// Returns `Ok(None)` when the key never existed or has expired.
    pub async fn get(&self, key: &str) -> Result<Option<V>> {
        self.ensure_open()?;
        let mut store = self.store.lock().await;
        Ok(store.get(key, Instant::now()))
    }

    // == Delete ==
    /// Removes `key`. Succeeds whether or not the key was present.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_open()?;
        let mut store = self.store.lock().await;
        store.delete(key);
        Ok(())
    }

    // == Close ==
    /// Stops the expiry sweeper and waits for it to exit.
    ///
    /// Calling `close` again is a no-op once a previous call has finished
    /// joining. Concurrent callers all wait for the same join. If the sweeper panicked, the join still completes and the
    /// fault is returned as `Internal`.
    pub async fn close(&self) -> Result<()> {
        self.shutdown.send_replace(true);

        let mut sweeper = self.sweeper.lock().await;
        let Some(handle) = sweeper.as_mut() else {
            debug!("Cache already closed");
            return Ok(());
        };

        // The handle stays in place until the join completes, so a cancelled
        // `close` leaves the next caller something to wait on.
        let joined = handle.await;
        *sweeper = None;

        match joined {
            Ok(()) => {
                info!("Cache closed");
                Ok(())
            }
            Err(err) => {
                error!("Expiry sweeper terminated abnormally: {}", err);
                Err(CacheError::Internal(format!("expiry sweeper failed: {err}")))
            }
        }
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    // == Introspection ==
    /// Number of entries currently stored, including expired ones the
    /// sweeper has not reached yet.
    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }

    /// Returns a snapshot of the cache counters.
    pub async fn stats(&self) -> CacheStats {
        self.store.lock().await.stats()
    }

    pub async fn capacity(&self) -> usize {
        self.store.lock().await.capacity()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(CacheError::Closed);
        }
        Ok(())
    }
}

impl<V, H> Drop for Cache<V, H> {
    fn drop(&mut self) {
        // Stop the sweeper if the owner never called `close`.
        self.shutdown.send_replace(true);
    }
}
