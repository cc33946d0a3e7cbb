//! Data source configuration.
//!
//! Every field has a default, so an empty document deserializes into
//! [`DataSourceOptions::default`].

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use crate::http::Headers;

// Default values for the memoization cache
const DEFAULT_MEMO_MAX_SIZE: usize = 100;
const DEFAULT_MEMO_MAX_AGE_MS: u64 = 5 * 60 * 1000;

/// Bounds of the in-process memoization cache.
///
/// A zero in either field means "use the default", the same as leaving it out.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoConfig {
    /// Maximum number of memoized calls kept (least recently used are evicted).
    pub max_size: usize,
    /// Maximum age of a memoized call in milliseconds, regardless of use.
    pub max_age_ms: u64,
}

impl MemoConfig {
    /// Effective capacity; `0` falls back to the default of 100.
    pub fn capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_size)
            .or(NonZeroUsize::new(DEFAULT_MEMO_MAX_SIZE))
            .unwrap_or(NonZeroUsize::MIN)
    }

    /// Effective maximum age; `0` falls back to the default of five minutes.
    pub fn max_age(&self) -> Duration {
        match self.max_age_ms {
            0 => Duration::from_millis(DEFAULT_MEMO_MAX_AGE_MS),
            ms => Duration::from_millis(ms),
        }
    }
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MEMO_MAX_SIZE,
            max_age_ms: DEFAULT_MEMO_MAX_AGE_MS,
        }
    }
}

/// Options applied to every request issued by one data source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    /// Base headers; a request's own header of the same name wins.
    pub headers: BTreeMap<String, String>,
}

impl RequestDefaults {
    pub(crate) fn header_map(&self) -> Headers {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

/// Top-level data source options.
///
/// # Examples
///
/// ```
/// use httpsource::config::DataSourceOptions;
///
/// let options: DataSourceOptions = serde_json::from_str(
///     r#"{ "memo": { "max_size": 10 }, "request_defaults": { "headers": { "X-Foo": "bar" } } }"#,
/// ).unwrap();
///
/// assert_eq!(options.memo.max_size, 10);
/// assert_eq!(options.memo.max_age_ms, 300_000);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataSourceOptions {
    pub memo: MemoConfig,
    pub request_defaults: RequestDefaults,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = DataSourceOptions::default();
        assert_eq!(options.memo.max_size, 100);
        assert_eq!(options.memo.max_age(), Duration::from_secs(300));
        assert!(options.request_defaults.headers.is_empty());
    }

    #[test]
    fn empty_document_uses_defaults() {
        let options: DataSourceOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.memo.max_size, 100);
    }

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let memo = MemoConfig {
            max_size: 0,
            max_age_ms: 0,
        };
        assert_eq!(memo.capacity().get(), 100);
        assert_eq!(memo.max_age(), Duration::from_secs(300));

        let memo: MemoConfig = serde_json::from_str(r#"{ "max_size": 0, "max_age_ms": 250 }"#).unwrap();
        assert_eq!(memo.capacity().get(), 100);
        assert_eq!(memo.max_age(), Duration::from_millis(250));
    }
}
