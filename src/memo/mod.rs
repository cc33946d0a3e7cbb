//! In-process memoization of GET calls.
//!
//! The cache stores the *pending* result of a call, not a finished value.
//! Every caller that asks for the same key while the entry is alive gets a
//! handle to the same shared future, so concurrent duplicate GETs collapse
//! into one upstream call and all waiters resume when it settles.
//!
//! Entries leave the cache by least-recently-used eviction once the capacity
//! is reached, or when older than the configured maximum age. Removing an
//! entry never cancels the call behind it; callers already holding the
//! handle keep polling it.

use std::sync::Mutex;
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use tokio::time::Instant;

use crate::config::MemoConfig;
use crate::error::Error;
use crate::http::Response;
use crate::lock::lock_entries;

const CACHE_NAME: &str = "memo";

/// The boxed future of one live call.
pub type ResponseFuture = BoxFuture<'static, Result<Response, Error>>;

/// A cloneable handle to a call's outcome, shared by every memoized waiter.
pub type PendingResponse = Shared<ResponseFuture>;

struct MemoEntry {
    stored_at: Instant,
    pending: PendingResponse,
}

/// Bounded, time-aware store of one pending result per cache key.
pub struct MemoCache {
    entries: Mutex<LruCache<String, MemoEntry>>,
    max_age: Duration,
}

impl MemoCache {
    pub fn new(config: &MemoConfig) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(config.capacity())),
            max_age: config.max_age(),
        }
    }

    /// Returns the pending result for `key`, marking it most recently used.
    ///
    /// An entry older than the maximum age is dropped and reported as absent.
    pub fn get(&self, key: &str) -> Option<PendingResponse> {
        let mut entries = lock_entries(&self.entries, CACHE_NAME, "get");

        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.max_age => {
                return Some(entry.pending.clone());
            }
            Some(_) => {}
            None => return None,
        }

        entries.pop(key);
        None
    }

    /// Stores `pending` under `key`, evicting the least recently used entry when full.
    pub fn insert(&self, key: impl Into<String>, pending: PendingResponse) {
        let entry = MemoEntry {
            stored_at: Instant::now(),
            pending,
        };
        lock_entries(&self.entries, CACHE_NAME, "insert").put(key.into(), entry);
    }

    /// Number of entries currently held, including ones past their maximum age
    /// that have not been looked up since.
    pub fn len(&self) -> usize {
        lock_entries(&self.entries, CACHE_NAME, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
