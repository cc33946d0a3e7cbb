//! # httpsource
//!
//! An async HTTP data source that pays for each distinct upstream call once.
//!
//! - **Memoization**: concurrent and repeated GETs for the same cache key
//!   share one in-flight call, held in a bounded LRU with a maximum age.
//! - **Persistent caching**: opt in per request. Cacheable responses are
//!   written to an external key-value store, and a longer-lived stale copy is
//!   served when the origin later fails.
//! - **Hooks**: request mutation, response classification, cacheability,
//!   cache-key policy and error observation, each with a default.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use httpsource::{CachePolicy, DataSource, MemoryCache, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = DataSource::builder("http://127.0.0.1:8080")
//!         .cache(Arc::new(MemoryCache::new()))
//!         .build();
//!
//!     let response = source
//!         .get("/movies", RequestOptions::new().query("page", 1).cache(CachePolicy::new(10, 60)))
//!         .await?;
//!     println!("{} memoized={} cached={}", response.status(), response.is_memoized(), response.is_from_cache());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod datasource;
pub mod error;
pub mod hooks;
pub mod http;
pub mod memo;
pub mod query;
pub mod store;
pub mod transport;

mod lock;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::{DataSourceOptions, MemoConfig, RequestDefaults};
pub use datasource::{DataSource, DataSourceBuilder};
pub use error::{CacheError, Error, RequestError, TransportError};
pub use hooks::{DefaultHooks, Hooks};
pub use http::{
    Body, CachePolicy, Headers, Method, Request, RequestOptions, Response, ResponseBody,
    StatusCode,
};
pub use store::{KeyValueCache, MemoryCache, PersistentCache};
pub use transport::{RawResponse, TcpTransport, Transport};
