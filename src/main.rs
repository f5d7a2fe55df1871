//! LRU/TTL Cache demo
//!
//! Exercises the cache the way an embedding process would: fill it past
//! capacity, store a short-lived key, let it expire, then shut down.

use std::env;
use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lru_ttl_cache::{Cache, Config};

/// Capacity used when `CACHE_CAPACITY` is not set
const DEMO_CAPACITY: usize = 10;

/// Demo entry point.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Insert more keys than the cache can hold
/// 4. Store a key with a short TTL and wait for the sweeper to reclaim it
/// 5. Print statistics and close the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lru_ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = demo_config();
    info!(
        "Configuration loaded: capacity={}, sweep_interval={}ms",
        config.capacity, config.sweep_interval_ms
    );

    let cache: Cache<String> = Cache::from_config(&config).context("failed to create cache")?;

    let inserts = config.capacity + config.capacity / 2;
    for i in 0..inserts {
        cache
            .set(format!("john{i}"), format!("doe{i}"), Duration::ZERO)
            .await?;
    }
    cache
        .set("jack", "bar".to_string(), Duration::from_secs(2))
        .await?;

    let key = format!("john{}", inserts - 1);
    match cache.get(&key).await? {
        Some(value) => info!("Value for key {}: {}", key, value),
        None => info!("Key {} not found", key),
    }
    match cache.get("john0").await? {
        Some(value) => info!("Value for key john0: {}", value),
        None => info!("Key john0 was evicted"),
    }

    tokio::time::sleep(Duration::from_secs(3)).await;
    info!("jack present after TTL: {}", cache.get("jack").await?.is_some());

    cache.delete("foo").await?;

    let stats = cache.stats().await;
    println!("{}", serde_json::to_string_pretty(&stats)?);

    cache.close().await?;
    Ok(())
}

/// Loads configuration from the environment, keeping the demo small unless
/// `CACHE_CAPACITY` asks otherwise.
fn demo_config() -> Config {
    let config = Config::from_env();
    if env::var("CACHE_CAPACITY").is_err() {
        return config.with_capacity(DEMO_CAPACITY);
    }
    config
}
