//! Outbound request model.
//!
//! A [`Request`] is built once per call from a method, origin, path and
//! [`RequestOptions`]. Construction canonicalizes the query string, so the
//! path returned by [`Request::path`] is already the wire path.

use std::fmt::Display;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{Headers, JSON_CONTENT_TYPE, Method};
use crate::context::Extensions;
use crate::query::{canonical_query, path_with_query};

/// A request body.
///
/// `Json` bodies are serialized exactly once, right before the live call,
/// and the `Content-Type` header defaults to JSON when the caller set none.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    /// Opaque bytes, sent as-is.
    Bytes(Bytes),
    /// A structured value to be serialized as JSON.
    Json(serde_json::Value),
}

impl Body {
    /// Creates an opaque body from text.
    pub fn text(text: impl Into<String>) -> Self {
        Body::Bytes(Bytes::from(text.into()))
    }

    /// Returns `true` if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(bytes) => bytes.is_empty(),
            Body::Json(_) => false,
        }
    }

    /// Returns the opaque bytes, or `None` for empty and structured bodies.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Opt-in persistent caching for a single GET call.
///
/// A cacheable response is stored for `fresh_ttl` seconds under its cache key
/// and for `fresh_ttl + stale_ttl` seconds under the stale-fallback key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePolicy {
    /// Seconds a response is served from the persistent cache.
    pub fresh_ttl: u64,
    /// Extra seconds a response stays available as an error fallback.
    pub stale_ttl: u64,
}

impl CachePolicy {
    pub fn new(fresh_ttl: u64, stale_ttl: u64) -> Self {
        Self {
            fresh_ttl,
            stale_ttl,
        }
    }

    /// Lifetime of the fresh entry.
    pub fn fresh_duration(&self) -> Duration {
        Duration::from_secs(self.fresh_ttl)
    }

    /// Lifetime of the stale-fallback entry.
    pub fn stale_duration(&self) -> Duration {
        Duration::from_secs(self.fresh_ttl.saturating_add(self.stale_ttl))
    }
}

/// Per-call options accepted by the verb helpers on
/// [`DataSource`](crate::datasource::DataSource).
///
/// # Examples
///
/// ```
/// use httpsource::http::{CachePolicy, RequestOptions};
///
/// let options = RequestOptions::new()
///     .header("Accept", "application/json")
///     .query("page", 2)
///     .query_opt("filter", None::<&str>)
///     .cache(CachePolicy::new(10, 20));
/// # let _ = options;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Headers,
    query: Vec<(String, Option<String>)>,
    body: Body,
    context: Extensions,
    cache: Option<CachePolicy>,
    cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a request header, replacing earlier values of the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Adds a query parameter; the value is stringified.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.query.push((key.into(), Some(value.to_string())));
        self
    }

    /// Adds a query parameter that is dropped when `value` is `None`.
    #[must_use]
    pub fn query_opt(mut self, key: impl Into<String>, value: Option<impl Display>) -> Self {
        self.query
            .push((key.into(), value.map(|v| v.to_string())));
        self
    }

    /// Sets a structured body that is serialized as JSON before sending.
    #[must_use]
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    /// Sets an opaque body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::Bytes(body.into());
        self
    }

    /// Attaches a context value that hooks can read back via [`Request::context`].
    #[must_use]
    pub fn context<T>(mut self, value: T) -> Self
    where
        T: Send + Sync + 'static,
    {
        self.context.insert(value);
        self
    }

    /// Opts this call into the persistent cache.
    #[must_use]
    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.cache = Some(policy);
        self
    }

    /// Cancels the live call when `token` fires.
    #[must_use]
    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// An outbound HTTP request with a canonical wire path.
///
/// # Examples
///
/// ```
/// use httpsource::http::{Method, Request, RequestOptions};
///
/// let options = RequestOptions::new().query("b", 2).query("a", 1);
/// let request = Request::new(Method::Get, "http://api.local", "/search", options);
///
/// assert_eq!(request.path(), "/search?a=1&b=2");
/// assert_eq!(request.query_string(), Some("a=1&b=2"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    origin: String,
    path: String,
    headers: Headers,
    body: Body,
    context: Extensions,
    cache: Option<CachePolicy>,
    cancel: Option<CancellationToken>,
}

impl Request {
    /// Builds a request, appending the canonical query string to `path`.
    pub fn new(
        method: Method,
        origin: impl Into<String>,
        path: impl AsRef<str>,
        options: RequestOptions,
    ) -> Self {
        let query = canonical_query(
            options
                .query
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_deref())),
        );

        Self {
            method,
            origin: origin.into(),
            path: path_with_query(path.as_ref(), &query),
            headers: options.headers,
            body: options.body,
            context: options.context,
            cache: options.cache,
            cancel: options.cancel,
        }
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Returns the origin (`scheme://host[:port]`).
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the wire path, including the canonical query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the canonical query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        self.path.split_once('?').map(|(_, query)| query)
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request headers for in-place modification.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the request body.
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Replaces the request body.
    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// Returns the caller-supplied context.
    pub fn context(&self) -> &Extensions {
        &self.context
    }

    /// Returns the persistent cache policy, if the caller opted in.
    pub fn cache_policy(&self) -> Option<CachePolicy> {
        self.cache
    }

    /// Returns the cancellation token for the live call, if any.
    pub fn cancel_token(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    /// Adds each default header whose name the request does not already carry.
    pub(crate) fn apply_default_headers(&mut self, defaults: &Headers) {
        self.headers.fill_missing(defaults);
    }

    /// Serializes a structured body in place, defaulting the `Content-Type`.
    pub(crate) fn serialize_body(&mut self) -> Result<(), serde_json::Error> {
        if let Body::Json(value) = &self.body {
            let bytes = serde_json::to_vec(value)?;
            if !self.headers.contains("content-type") {
                self.headers.insert("content-type", JSON_CONTENT_TYPE);
            }
            self.body = Body::Bytes(Bytes::from(bytes));
        }
        Ok(())
    }
}
