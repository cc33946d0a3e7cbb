//! Query canonicalization and default cache-key derivation.
//!
//! Two requests that carry the same parameters in a different order must hit
//! the same cache entry and put the same bytes on the wire, so every query
//! string is produced by [`canonical_query`].

use url::form_urlencoded;

use crate::http::Request;

/// Serializes query parameters into a canonical `application/x-www-form-urlencoded` string.
///
/// Parameters whose value is `None` are dropped. Each remaining pair is
/// encoded as `key=value` and the encoded pairs are sorted lexicographically
/// before being joined with `&`, so the output is independent of insertion order.
///
/// # Examples
///
/// ```
/// use httpsource::query::canonical_query;
///
/// let a = canonical_query([("b", Some("2")), ("a", Some("1")), ("z", Some("z"))]);
/// let b = canonical_query([("z", Some("z")), ("a", Some("1")), ("b", Some("2"))]);
/// assert_eq!(a, "a=1&b=2&z=z");
/// assert_eq!(a, b);
/// ```
pub fn canonical_query<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<String> = params
        .into_iter()
        .filter_map(|(key, value)| {
            let value = value?;
            Some(
                form_urlencoded::Serializer::new(String::new())
                    .append_pair(key.as_ref(), value.as_ref())
                    .finish(),
            )
        })
        .collect();
    pairs.sort_unstable();
    pairs.join("&")
}

/// Appends the canonical query string to `path`, omitting `?` when nothing remains.
pub(crate) fn path_with_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        path.to_owned()
    } else {
        format!("{path}?{query}")
    }
}

/// The cache key used when no hook overrides it: `origin + path`.
///
/// The request path already carries the canonical query string.
pub fn default_cache_key(request: &Request) -> String {
    format!("{}{}", request.origin(), request.path())
}
