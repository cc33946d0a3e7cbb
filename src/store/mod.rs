//! Persistent response cache.
//!
//! [`KeyValueCache`] is the seam to an external key-value store (Redis,
//! memcached, a database). [`PersistentCache`] layers the response protocol
//! on top of it: each cacheable response is written twice, once under its
//! cache key with the fresh TTL and once under `stale:{key}` with the fresh
//! plus stale TTL, the latter serving as the fallback when the origin fails.
//!
//! Writes are fire-and-forget: [`PersistentCache::write_through`] spawns
//! detached tasks that are never awaited and whose failures only reach the log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::error::CacheError;
use crate::http::{CachePolicy, Response};
use crate::lock::lock_entries;

/// Prefix of the stale-fallback entry.
pub const STALE_PREFIX: &str = "stale:";

/// Returns the stale-fallback key for `key`.
pub fn stale_key(key: &str) -> String {
    format!("{STALE_PREFIX}{key}")
}

/// An asynchronous, fallible key-value store with per-entry TTL.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Returns the stored bytes, or `None` if the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Stores `value` for `ttl`, overwriting any existing entry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`, returning `true` if it was present.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;
}

const CACHE_NAME: &str = "store::memory";

/// An in-process [`KeyValueCache`] with lazy TTL expiry.
///
/// Useful as a default backend and as a test double.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until next touched.
    pub fn len(&self) -> usize {
        lock_entries(&self.entries, CACHE_NAME, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut entries = lock_entries(&self.entries, CACHE_NAME, "get");
        match entries.get(key) {
            Some((value, expires_at)) if Instant::now() < *expires_at => {
                return Ok(Some(value.clone()));
            }
            Some(_) => {}
            None => return Ok(None),
        }

        entries.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        lock_entries(&self.entries, CACHE_NAME, "set").insert(key.to_owned(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        Ok(lock_entries(&self.entries, CACHE_NAME, "delete")
            .remove(key)
            .is_some())
    }
}

/// Response-level protocol over a [`KeyValueCache`].
#[derive(Clone)]
pub struct PersistentCache {
    backend: Arc<dyn KeyValueCache>,
}

impl PersistentCache {
    pub fn new(backend: Arc<dyn KeyValueCache>) -> Self {
        Self { backend }
    }

    /// Returns the underlying key-value store.
    pub fn backend(&self) -> &Arc<dyn KeyValueCache> {
        &self.backend
    }

    /// Loads and deserializes the fresh entry for `key`.
    pub async fn load(&self, key: &str) -> Result<Option<Response>, CacheError> {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Loads and deserializes the stale-fallback entry for `key`.
    pub async fn load_stale(&self, key: &str) -> Result<Option<Response>, CacheError> {
        self.load(&stale_key(key)).await
    }

    /// Serializes `response` and stores it under `key`.
    pub async fn store(&self, key: &str, response: &Response, ttl: Duration) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(response)?;
        self.backend.set(key, bytes, ttl).await
    }

    /// Serializes `response` and stores it under the stale-fallback key.
    pub async fn store_stale(
        &self,
        key: &str,
        response: &Response,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.store(&stale_key(key), response, ttl).await
    }

    /// Writes both entries for a cacheable response on detached tasks.
    ///
    /// The fresh entry goes through [`store`](Self::store) with the fresh TTL,
    /// the fallback entry through [`store_stale`](Self::store_stale) with the
    /// fresh plus stale TTL. Must be called from within a Tokio runtime.
    /// Returns immediately; failures are logged and otherwise ignored.
    pub fn write_through(&self, key: &str, response: &Response, policy: CachePolicy) {
        let response = Arc::new(response.clone());

        let cache = self.clone();
        let fresh = Arc::clone(&response);
        let fresh_key = key.to_owned();
        tokio::spawn(async move {
            let ttl = policy.fresh_duration();
            let result = cache.store(&fresh_key, &fresh, ttl).await;
            log_write(&fresh_key, ttl, result);
        });

        let cache = self.clone();
        let stale_key_name = stale_key(key);
        let key = key.to_owned();
        tokio::spawn(async move {
            let ttl = policy.stale_duration();
            let result = cache.store_stale(&key, &response, ttl).await;
            log_write(&stale_key_name, ttl, result);
        });
    }
}

fn log_write(key: &str, ttl: Duration, result: Result<(), CacheError>) {
    match result {
        Ok(()) => debug!(key = %key, ttl_secs = ttl.as_secs(), "cache entry written"),
        Err(e) => error!(key = %key, error = %e, "cache write failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ResponseBody;
    use serde_json::json;

    fn sample() -> Response {
        Response::new(200)
            .header("content-type", "application/json")
            .with_body(ResponseBody::Json(json!({ "name": "foo" })))
    }

    #[tokio::test(start_paused = true)]
    async fn memory_cache_expires_entries() {
        let cache = MemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_secs(10)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn memory_cache_delete() {
        let cache = MemoryCache::new();
        cache.set("k", b"v".to_vec(), Duration::from_secs(10)).await.unwrap();
        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn store_and_load_round_trip() {
        let cache = PersistentCache::new(Arc::new(MemoryCache::new()));
        cache.store("k", &sample(), Duration::from_secs(10)).await.unwrap();
        cache.store_stale("k", &sample(), Duration::from_secs(30)).await.unwrap();

        assert_eq!(cache.load("k").await.unwrap(), Some(sample()));
        assert_eq!(cache.load_stale("k").await.unwrap(), Some(sample()));
        assert_eq!(cache.load("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_cache_error() {
        let backend = Arc::new(MemoryCache::new());
        backend.set("k", b"not json".to_vec(), Duration::from_secs(10)).await.unwrap();
        let cache = PersistentCache::new(backend);
        assert!(matches!(cache.load("k").await, Err(CacheError::Serialization(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn write_through_uses_fresh_and_stale_ttls() {
        let backend = Arc::new(MemoryCache::new());
        let cache = PersistentCache::new(backend.clone());
        cache.write_through("k", &sample(), CachePolicy::new(10, 20));

        // let the detached writes run
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert!(backend.get("k").await.unwrap().is_some());
        assert!(backend.get("stale:k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(backend.get("k").await.unwrap().is_none());
        assert!(backend.get("stale:k").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(backend.get("stale:k").await.unwrap().is_none());
    }

    #[derive(Default)]
    struct Recording {
        inner: MemoryCache,
        writes: Mutex<Vec<(String, Duration)>>,
    }

    #[async_trait]
    impl KeyValueCache for Recording {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
            self.writes.lock().unwrap().push((key.to_owned(), ttl));
            self.inner.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> Result<bool, CacheError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn write_through_stores_readable_fresh_and_fallback_entries() {
        let backend = Arc::new(Recording::default());
        let cache = PersistentCache::new(backend.clone());
        cache.write_through("k", &sample(), CachePolicy::new(10, 20));

        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        let mut writes = backend.writes.lock().unwrap().clone();
        writes.sort();
        assert_eq!(
            writes,
            [
                ("k".to_owned(), Duration::from_secs(10)),
                ("stale:k".to_owned(), Duration::from_secs(30)),
            ]
        );
        assert_eq!(cache.load("k").await.unwrap(), Some(sample()));
        assert_eq!(cache.load_stale("k").await.unwrap(), Some(sample()));
    }
}
