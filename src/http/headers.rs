//! Header fields shared by outbound requests and cached responses.
//!
//! Field names compare case-insensitively (RFC 9110 §5.1) but keep the
//! spelling they were given, which is also the spelling put on the wire.

use serde::{Deserialize, Serialize};

/// Ordered, multi-value header fields.
///
/// Stored as a list of `(name, value)` pairs. That list is also the serde
/// shape, `[["name", "value"], ...]`, so a response read back from the
/// persistent cache keeps repeated fields in their original order.
///
/// # Examples
///
/// ```
/// use httpsource::http::Headers;
///
/// let mut headers: Headers = [("Accept", "application/json")].into_iter().collect();
/// headers.insert("X-Trace", "a");
/// headers.set("x-trace", "b");
///
/// assert_eq!(headers.get("ACCEPT"), Some("application/json"));
/// assert_eq!(headers.get_all("x-trace").collect::<Vec<_>>(), ["b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Adds a field, keeping any earlier values of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Replaces every value of `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.fields.push((name, value.into()));
    }

    /// Copies each field of `defaults` whose name is not present yet.
    ///
    /// Presence is checked against the fields held before the call, so
    /// repeated default values are all copied.
    pub fn fill_missing(&mut self, defaults: &Headers) {
        let existing = self.fields.len();
        for (name, value) in defaults.iter() {
            let present = self.fields[..existing]
                .iter()
                .any(|(n, _)| n.eq_ignore_ascii_case(name));
            if !present {
                self.insert(name, value);
            }
        }
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Every value of `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// The `Content-Type` field, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    /// Drops every value of `name`, returning `true` if there was one.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.fields.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of fields, counting repeated names separately.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
