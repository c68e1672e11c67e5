//! Cache plumbing for limit and flag state.
//!
//! The client reads through two caches: an in-process cache for individual
//! flag evaluations, and an optional shared cache (memcached, Redis, ...)
//! that lets a fleet of processes pool bulk flag fetches and known
//! exhaustion windows. [`CacheBackend`] is the seam applications implement
//! to plug in their own store; [`MemoryCache`] and [`NoopCache`] cover the
//! single-process and cache-less cases.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{Expiry, sync::Cache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::RatelimError;

const DEFAULT_MEMORY_CACHE_CAPACITY: u64 = 10_000;

/// Shared-cache key for the bulk flag fetch. Shared-cache keys keep this
/// exact format so processes using other client libraries hit the same
/// entries.
pub(crate) const ALL_FEATURES_CACHE_KEY: &str = "it.ratelim:get_all_features";

/// Shared-cache key recording when an exhausted group's window resets.
pub(crate) fn expiry_cache_key(group: &str) -> String {
    format!("it.ratelim.expiry:{group}")
}

/// In-process cache key for one flag evaluation. Never leaves this process,
/// so the exact composition only has to be stable locally.
pub(crate) fn flag_cache_key(
    feature: &str,
    lookup_key: Option<&str>,
    attributes: &[&str],
) -> String {
    format!(
        "it.ratelim.ff:{feature}.{}.{}",
        lookup_key.unwrap_or_default(),
        attributes.join(",")
    )
}

/// A place the client can stash small JSON values.
///
/// A `ttl` of `None` means the entry has no expiry of its own; backends with
/// mandatory expiry may substitute a generous default. Implementations
/// should absorb their own I/O failures (log them and report a miss) rather
/// than surface them, since cache trouble must never break a limit check.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn read(&self, key: &str) -> Option<Value>;
    async fn write(&self, key: &str, value: Value, ttl: Option<Duration>);
}

/// Cache that stores nothing, for processes that opt out of shared state.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;

#[async_trait]
impl CacheBackend for NoopCache {
    async fn read(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn write(&self, _key: &str, _value: Value, _ttl: Option<Duration>) {}
}

#[derive(Clone)]
struct MemoryEntry {
    value: Value,
    ttl: Option<Duration>,
}

struct MemoryExpiry;

impl Expiry<String, MemoryEntry> for MemoryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &MemoryEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &MemoryEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// In-process [`CacheBackend`] with per-entry TTLs, bounded by entry count.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, MemoryEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CACHE_CAPACITY)
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(MemoryExpiry)
                .build(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn read(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value)
    }

    async fn write(&self, key: &str, value: Value, ttl: Option<Duration>) {
        self.entries
            .insert(key.to_string(), MemoryEntry { value, ttl });
    }
}

/// Reads `key` from `cache`, computing and caching the value for `ttl` on a
/// miss. A cached value that no longer deserializes counts as a miss.
pub(crate) async fn fetch_or_compute<T, F, Fut>(
    cache: &dyn CacheBackend,
    key: &str,
    ttl: Duration,
    compute: F,
) -> Result<T, RatelimError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, RatelimError>>,
{
    if let Some(hit) = cache.read(key).await
        && let Ok(value) = serde_json::from_value(hit)
    {
        return Ok(value);
    }
    let computed = compute().await?;
    match serde_json::to_value(&computed) {
        Ok(value) => cache.write(key, value, Some(ttl)).await,
        Err(error) => {
            tracing::warn!(key, error = %error, "discarding unserializable cache write");
        }
    }
    Ok(computed)
}
