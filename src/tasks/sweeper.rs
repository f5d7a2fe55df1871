//! Expiry Sweeper Task
//!
//! Background task that periodically removes expired cache entries, whether
//! or not anyone reads them again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::{CacheStore, SlotHasher};

/// Spawns the expiry sweeper for `store`.
///
/// Every `interval` the task takes the store lock and purges all expired
/// entries across every bucket chain. It stops once `shutdown` flips to
/// `true` or its sender is dropped, and never on its own otherwise. The lock
/// is only held for the duration of one purge, so the task never exits while
/// holding it.
///
/// # Arguments
/// * `store` - Shared store, the same lock callers go through
/// * `interval` - Time between sweeps
/// * `shutdown` - Stop signal
///
/// # Returns
/// A JoinHandle the owner awaits to observe the task's exit.
///
/// # Example
/// ```ignore
/// let store = Arc::new(Mutex::new(CacheStore::<String>::new(1000)?));
/// let (stop, stopped) = watch::channel(false);
/// let sweeper = spawn_sweeper(store.clone(), Duration::from_millis(100), stopped);
/// // Later, during shutdown:
/// stop.send_replace(true);
/// sweeper.await?;
/// ```
pub fn spawn_sweeper<V, H>(
    store: Arc<Mutex<CacheStore<V, H>>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
    H: SlotHasher,
{
    tokio::spawn(async move {
        info!("Starting expiry sweeper with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Sweeper shutdown sender dropped");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let removed = {
                        let mut guard = store.lock().await;
                        guard.purge_expired(Instant::now())
                    };

                    if removed > 0 {
                        info!("Expiry sweep: removed {} expired entries", removed);
                    } else {
                        debug!("Expiry sweep: no expired entries found");
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    })
}
