//! Lock access for the in-process caches.
//!
//! Both caches keep plain data behind a `Mutex`, and every critical section
//! leaves that data consistent. A panic elsewhere while a guard was held
//! therefore poisons the lock without corrupting it, so the guard is taken
//! back and the event is logged instead of failing every later request.

use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Locks `entries`, recovering the guard if a previous holder panicked.
///
/// `cache` names the cache and `op` the operation in the log event.
pub(crate) fn lock_entries<'a, T>(
    entries: &'a Mutex<T>,
    cache: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    entries.lock().unwrap_or_else(|poisoned| {
        warn!(cache, op, "cache lock was poisoned by a panicking holder; reusing its entries");
        poisoned.into_inner()
    })
}
