//! The request pipeline.
//!
//! [`DataSource`] wraps one upstream origin. Each call goes through:
//!
//! 1. Build the request with its canonical wire path and derive the cache key
//!    (via [`Hooks::cache_key`]).
//! 2. GET only: return the memoized result for the key, if any. No network.
//! 3. GET only, when the caller passed a [`CachePolicy`](crate::http::CachePolicy):
//!    return the persistent-cache entry, if any. A failing read is logged and
//!    treated as a miss.
//! 4. Perform the live call. For GET the pending call is memoized *before* it
//!    is awaited, so concurrent duplicates wait on the same call.
//!
//! The live call serializes a structured body, runs [`Hooks::on_request`],
//! calls the transport, parses the body, classifies it with
//! [`Hooks::on_response`] and, when [`Hooks::is_cacheable`] agrees and a cache
//! policy is set, writes the response through to the persistent cache without
//! waiting. If any of that fails, [`Hooks::on_error`] observes the error and
//! the stale-fallback entry is tried before the error reaches the caller.
//!
//! The memoization entry is inserted only after the persistent-cache read
//! settles, so concurrent duplicate GETs that opted into the persistent cache
//! can each reach the origin while that read is slow or failing.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::config::DataSourceOptions;
use crate::error::Error;
use crate::hooks::{DefaultHooks, Hooks};
use crate::http::{Headers, Method, Request, RequestOptions, Response, ResponseBody};
use crate::memo::{MemoCache, PendingResponse};
use crate::store::{KeyValueCache, PersistentCache};
use crate::transport::{TcpTransport, Transport, execute_cancellable};

/// Configures and creates a [`DataSource`].
///
/// Defaults: [`TcpTransport`], [`DefaultHooks`], no persistent cache,
/// [`DataSourceOptions::default`].
pub struct DataSourceBuilder {
    base_url: String,
    transport: Option<Arc<dyn Transport>>,
    hooks: Arc<dyn Hooks>,
    cache: Option<PersistentCache>,
    options: DataSourceOptions,
}

impl DataSourceBuilder {
    /// Sets the transport used for live calls.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overrides the pipeline hooks.
    #[must_use]
    pub fn hooks(mut self, hooks: impl Hooks + 'static) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Sets the key-value store backing the persistent cache.
    ///
    /// Without one, cache policies on requests have no effect.
    #[must_use]
    pub fn cache(mut self, backend: Arc<dyn KeyValueCache>) -> Self {
        self.cache = Some(PersistentCache::new(backend));
        self
    }

    /// Sets memoization bounds and per-request defaults.
    #[must_use]
    pub fn options(mut self, options: DataSourceOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> DataSource {
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(TcpTransport::new()));

        DataSource {
            inner: Arc::new(Inner {
                memo: MemoCache::new(&self.options.memo),
                default_headers: self.options.request_defaults.header_map(),
                base_url: self.base_url,
                transport,
                hooks: self.hooks,
                cache: self.cache,
            }),
        }
    }
}

/// An HTTP data source with request memoization and persistent caching.
///
/// Cloning is cheap; clones share the memoization cache, hooks, transport and
/// persistent cache.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use httpsource::{CachePolicy, DataSource, MemoryCache, RequestOptions};
///
/// # async fn run() -> Result<(), httpsource::Error> {
/// let source = DataSource::builder("http://127.0.0.1:8080")
///     .cache(Arc::new(MemoryCache::new()))
///     .build();
///
/// let options = RequestOptions::new()
///     .query("id", 42)
///     .cache(CachePolicy::new(10, 20));
/// let user = source.get("/users", options).await?;
/// println!("{:?}", user.body());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DataSource {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    transport: Arc<dyn Transport>,
    hooks: Arc<dyn Hooks>,
    cache: Option<PersistentCache>,
    memo: MemoCache,
    default_headers: Headers,
}

impl DataSource {
    /// Starts configuring a data source for `base_url` (`http://host[:port]`).
    pub fn builder(base_url: impl Into<String>) -> DataSourceBuilder {
        DataSourceBuilder {
            base_url: base_url.into(),
            transport: None,
            hooks: Arc::new(DefaultHooks),
            cache: None,
            options: DataSourceOptions::default(),
        }
    }

    /// Creates a data source with every default.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder(base_url).build()
    }

    /// Returns the origin every request is sent to.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Returns the in-process memoization cache.
    pub fn memo(&self) -> &MemoCache {
        &self.inner.memo
    }

    /// Returns the persistent cache, if one was configured.
    pub fn persistent_cache(&self) -> Option<&PersistentCache> {
        self.inner.cache.as_ref()
    }

    /// Issues a GET request.
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Get, path, options).await
    }

    /// Issues a POST request.
    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Post, path, options).await
    }

    /// Issues a PUT request.
    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Put, path, options).await
    }

    /// Issues a PATCH request.
    pub async fn patch(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Patch, path, options).await
    }

    /// Issues a DELETE request.
    pub async fn delete(&self, path: &str, options: RequestOptions) -> Result<Response, Error> {
        self.request(Method::Delete, path, options).await
    }

    /// Builds a request against the base URL and sends it through the pipeline.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, Error> {
        let request = Request::new(method, self.inner.base_url.as_str(), path, options);
        self.send(request).await
    }

    /// Sends a fully built request through the memoization and caching pipeline.
    pub async fn send(&self, mut request: Request) -> Result<Response, Error> {
        let inner = &self.inner;
        let cache_key = inner.hooks.cache_key(&request);
        let is_get = request.method() == Method::Get;

        if is_get {
            if let Some(pending) = inner.memo.get(&cache_key) {
                debug!(key = %cache_key, "serving memoized response");
                return pending.await.map(Response::into_memoized);
            }
        }

        request.apply_default_headers(&inner.default_headers);

        if !is_get {
            return Arc::clone(inner).perform_request(request, cache_key).await;
        }

        if request.cache_policy().is_some() {
            if let Some(cache) = &inner.cache {
                match cache.load(&cache_key).await {
                    Ok(Some(response)) => {
                        debug!(key = %cache_key, "serving response from persistent cache");
                        return Ok(response.into_cached());
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(key = %cache_key, error = %e, "cache item could not be loaded");
                    }
                }
            }
        }

        let pending: PendingResponse = Arc::clone(inner)
            .perform_request(request, cache_key.clone())
            .boxed()
            .shared();
        inner.memo.insert(cache_key, pending.clone());
        pending.await
    }
}

impl Inner {
    /// Runs the live call and, on failure, the error hook and stale fallback.
    async fn perform_request(
        self: Arc<Self>,
        mut request: Request,
        cache_key: String,
    ) -> Result<Response, Error> {
        let error = match self.live_call(&mut request, &cache_key).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        self.hooks.on_error(&error, &request)?;

        if request.cache_policy().is_some() {
            if let Some(cache) = &self.cache {
                match cache.load_stale(&cache_key).await {
                    Ok(Some(response)) => {
                        warn!(key = %cache_key, error = %error, "upstream failed; serving stale response");
                        return Ok(response.into_cached());
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(key = %cache_key, error = %e, "stale cache item could not be loaded");
                    }
                }
            }
        }

        Err(error)
    }

    async fn live_call(&self, request: &mut Request, cache_key: &str) -> Result<Response, Error> {
        request.serialize_body()?;
        self.hooks.on_request(request).await?;

        debug!(
            method = %request.method(),
            origin = %request.origin(),
            path = %request.path(),
            "performing live call"
        );

        let raw = execute_cancellable(self.transport.as_ref(), request).await?;
        let body = ResponseBody::from_wire(raw.headers.content_type(), raw.body)?;
        let response = Response::new(raw.status)
            .with_headers(raw.headers)
            .with_body(body);

        let mut response = self.hooks.on_response(request, response)?;

        if let Some(policy) = request.cache_policy() {
            if self.hooks.is_cacheable(request, &response) {
                response.set_max_ttl(policy.fresh_ttl);
                if let Some(cache) = &self.cache {
                    cache.write_through(cache_key, &response, policy);
                }
            }
        }

        Ok(response)
    }
}
