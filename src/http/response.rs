//! Classified upstream response.
//!
//! A [`Response`] records where it came from: a live call, the in-process
//! memoization cache, or the persistent cache. It is also the value written
//! to the persistent cache, so its serde shape is the stored format.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{Headers, JSON_MEDIA_TYPE, StatusCode, reason_phrase};

/// A response body as handed back to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseBody {
    #[default]
    Empty,
    /// Non-JSON UTF-8 content, kept as raw text.
    Text(String),
    /// Content announced as JSON, parsed.
    Json(serde_json::Value),
    /// Non-JSON content that is not valid UTF-8.
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// Interprets raw wire bytes using the response `Content-Type`.
    ///
    /// Only a non-empty body whose content type contains `application/json`
    /// is parsed; anything else is kept as text (or bytes if not UTF-8).
    pub fn from_wire(content_type: Option<&str>, bytes: Bytes) -> Result<Self, serde_json::Error> {
        if bytes.is_empty() {
            return Ok(ResponseBody::Empty);
        }

        if content_type.is_some_and(|ct| ct.contains(JSON_MEDIA_TYPE)) {
            return serde_json::from_slice(&bytes).map(ResponseBody::Json);
        }

        Ok(match String::from_utf8(bytes.to_vec()) {
            Ok(text) => ResponseBody::Text(text),
            Err(e) => ResponseBody::Bytes(e.into_bytes()),
        })
    }

    /// Returns the parsed JSON value, if the body was JSON.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the raw text, if the body was kept as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// An HTTP response together with its provenance flags.
///
/// At most one of [`is_from_cache`](Self::is_from_cache) and
/// [`is_memoized`](Self::is_memoized) is `true`; both `false` means the value
/// came from a live transport call.
///
/// # Examples
///
/// ```
/// use httpsource::http::{Response, ResponseBody};
/// use serde_json::json;
///
/// let response = Response::new(200)
///     .header("content-type", "application/json")
///     .with_body(ResponseBody::Json(json!({ "name": "foo" })));
///
/// assert!(response.is_success());
/// assert_eq!(response.body().as_json(), Some(&json!({ "name": "foo" })));
/// assert!(!response.is_from_cache() && !response.is_memoized());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    status: u16,
    #[serde(default)]
    headers: Headers,
    #[serde(default)]
    body: ResponseBody,
    #[serde(default)]
    is_from_cache: bool,
    #[serde(default)]
    memoized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_ttl: Option<u64>,
}

impl Response {
    /// Creates a live response with the given status and an empty body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: ResponseBody::Empty,
            is_from_cache: false,
            memoized: false,
            max_ttl: None,
        }
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces all response headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the response body.
    #[must_use]
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    /// Returns the numeric status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns the status as a known [`StatusCode`], if it is one.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status)
    }

    /// Returns the reason phrase for the status code.
    pub fn reason(&self) -> &'static str {
        reason_phrase(self.status)
    }

    /// Returns `true` for statuses in `200..=399`.
    pub fn is_success(&self) -> bool {
        (200..=399).contains(&self.status)
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the response body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Deserializes a JSON (or JSON-looking text) body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            ResponseBody::Json(value) => T::deserialize(value),
            ResponseBody::Text(text) => serde_json::from_str(text),
            ResponseBody::Bytes(bytes) => serde_json::from_slice(bytes),
            ResponseBody::Empty => serde_json::from_str(""),
        }
    }

    /// `true` when served from the persistent cache.
    pub fn is_from_cache(&self) -> bool {
        self.is_from_cache
    }

    /// `true` when served from the in-process memoization cache.
    pub fn is_memoized(&self) -> bool {
        self.memoized
    }

    /// The fresh TTL (seconds) in effect when this response was cached.
    pub fn max_ttl(&self) -> Option<u64> {
        self.max_ttl
    }

    pub(crate) fn set_max_ttl(&mut self, max_ttl: u64) {
        self.max_ttl = Some(max_ttl);
    }

    /// Provenance of a value handed out by the memoization cache.
    pub(crate) fn into_memoized(mut self) -> Self {
        self.memoized = true;
        self.is_from_cache = false;
        self
    }

    /// Provenance of a value loaded from the persistent cache.
    pub(crate) fn into_cached(mut self) -> Self {
        self.memoized = false;
        self.is_from_cache = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_content_type_is_parsed() {
        let body = ResponseBody::from_wire(
            Some("application/json; charset=utf-8"),
            Bytes::from_static(br#"{"name":"foo"}"#),
        )
        .unwrap();
        assert_eq!(body, ResponseBody::Json(json!({ "name": "foo" })));
    }

    #[test]
    fn missing_content_type_is_kept_as_text() {
        let body = ResponseBody::from_wire(None, Bytes::from_static(br#"{"name":"foo"}"#)).unwrap();
        assert_eq!(body.as_text(), Some(r#"{"name":"foo"}"#));
    }

    #[test]
    fn empty_json_body_is_not_parsed() {
        let body = ResponseBody::from_wire(Some("application/json"), Bytes::new()).unwrap();
        assert_eq!(body, ResponseBody::Empty);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(ResponseBody::from_wire(Some("application/json"), Bytes::from_static(b"{")).is_err());
    }

    #[test]
    fn stored_shape_uses_camel_case_flags() {
        let mut response = Response::new(200).with_body(ResponseBody::Text("hi".into()));
        response.set_max_ttl(10);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "status": 200,
                "headers": [],
                "body": { "text": "hi" },
                "isFromCache": false,
                "memoized": false,
                "maxTtl": 10
            })
        );
    }

    #[test]
    fn provenance_flags_are_exclusive() {
        let cached = Response::new(200).into_memoized().into_cached();
        assert!(cached.is_from_cache() && !cached.is_memoized());
        let memo = cached.into_memoized();
        assert!(memo.is_memoized() && !memo.is_from_cache());
    }

    #[test]
    fn typed_json_access() {
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }
        let response = Response::new(200).with_body(ResponseBody::Json(json!({ "name": "foo" })));
        assert_eq!(response.json::<Named>().unwrap().name, "foo");
    }
}
