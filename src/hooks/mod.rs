//! Extension points of the request pipeline.
//!
//! [`Hooks`] is a strategy object injected into a
//! [`DataSource`](crate::datasource::DataSource). Every method has a default,
//! so an implementation overrides only what it needs:
//!
//! | Hook             | Runs                                              | Default                          |
//! |------------------|---------------------------------------------------|----------------------------------|
//! | `on_request`     | once per live call, after the cache checks        | no-op                            |
//! | `on_response`    | on every live response                            | error unless status `200..=399`  |
//! | `is_cacheable`   | after a successful live response                  | GET with status 200 or 203       |
//! | `cache_key`      | once per call, before any cache lookup            | `origin + path`                  |
//! | `on_error`       | when the live call fails, before stale fallback   | no-op                            |

use async_trait::async_trait;

use crate::error::{Error, RequestError};
use crate::http::{Method, Request, Response};
use crate::query::default_cache_key;

/// Statuses whose GET responses are written to the persistent cache by default.
pub const CACHEABLE_STATUSES: [u16; 2] = [200, 203];

/// Overridable pipeline behavior.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use httpsource::{Error, Hooks, Request};
///
/// struct BearerAuth(String);
///
/// #[async_trait]
/// impl Hooks for BearerAuth {
///     async fn on_request(&self, request: &mut Request) -> Result<(), Error> {
///         request
///             .headers_mut()
///             .set("Authorization", format!("Bearer {}", self.0));
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Mutates the request right before it is sent. The body is already serialized.
    async fn on_request(&self, request: &mut Request) -> Result<(), Error> {
        let _ = request;
        Ok(())
    }

    /// Classifies a live response, returning it (possibly rewritten) or an error.
    fn on_response(&self, request: &Request, response: Response) -> Result<Response, Error> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(RequestError::from_response(request, response).into())
        }
    }

    /// Decides whether a successful response is written to the persistent cache.
    fn is_cacheable(&self, request: &Request, response: &Response) -> bool {
        request.method() == Method::Get && CACHEABLE_STATUSES.contains(&response.status())
    }

    /// Derives the key used by both cache tiers. Does not affect the wire path.
    fn cache_key(&self, request: &Request) -> String {
        default_cache_key(request)
    }

    /// Observes a failed live call. An error returned here is propagated
    /// as-is and skips the stale fallback.
    fn on_error(&self, error: &Error, request: &Request) -> Result<(), Error> {
        let _ = (error, request);
        Ok(())
    }
}

/// The hook set with every default in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHooks;

impl Hooks for DefaultHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestOptions;

    fn request(method: Method) -> Request {
        Request::new(method, "http://api.local", "/items", RequestOptions::new())
    }

    #[test]
    fn success_boundary() {
        let hooks = DefaultHooks;
        let req = request(Method::Get);
        for status in [200, 204, 304, 399] {
            assert!(hooks.on_response(&req, Response::new(status)).is_ok(), "{status}");
        }
        for status in [400, 404, 500] {
            let err = hooks.on_response(&req, Response::new(status)).unwrap_err();
            assert_eq!(err.status_code(), Some(status));
        }
    }

    #[test]
    fn classification_message() {
        let err = DefaultHooks
            .on_response(&request(Method::Get), Response::new(500))
            .unwrap_err();
        assert_eq!(err.to_string(), "Response code 500 (Internal Server Error)");

        let err = DefaultHooks
            .on_response(&request(Method::Get), Response::new(407))
            .unwrap_err();
        assert_eq!(err.to_string(), "Response code 407 (Proxy Authentication Required)");
    }

    #[test]
    fn only_get_200_and_203_are_cacheable() {
        let hooks = DefaultHooks;
        let get = request(Method::Get);
        assert!(hooks.is_cacheable(&get, &Response::new(200)));
        assert!(hooks.is_cacheable(&get, &Response::new(203)));
        assert!(!hooks.is_cacheable(&get, &Response::new(204)));
        assert!(!hooks.is_cacheable(&get, &Response::new(300)));
        assert!(!hooks.is_cacheable(&request(Method::Post), &Response::new(200)));
    }

    #[test]
    fn default_cache_key_is_origin_and_path() {
        assert_eq!(
            DefaultHooks.cache_key(&request(Method::Get)),
            "http://api.local/items"
        );
    }

    #[tokio::test]
    async fn on_request_default_leaves_request_alone() {
        let mut req = request(Method::Get);
        DefaultHooks.on_request(&mut req).await.unwrap();
        assert!(req.headers().is_empty());
    }
}
