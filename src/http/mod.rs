//! HTTP protocol types used on both sides of the data source.
//!
//! This module provides the core HTTP primitives:
//! [`Method`], [`StatusCode`], [`Headers`], the outbound [`Request`] and the
//! classified [`Response`].

use std::fmt;

use thiserror::Error;

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::{Body, CachePolicy, Request, RequestOptions};
pub use response::{Response, ResponseBody};

/// Media type used to detect and produce structured (JSON) bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// `Content-Type` value written for serialized request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// Expands one `(code, Variant, "Reason Phrase")` table into the enum, the
// numeric lookup and the phrase lookup.
macro_rules! status_codes {
    (
        $(#[$meta:meta])*
        pub enum $ty:ident {
            $( ($code:literal, $variant:ident, $phrase:literal); )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum $ty {
            $( $variant = $code, )+
        }

        impl $ty {
            /// Looks up a registered status code by number.
            pub fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Returns the canonical reason phrase for this status code.
            pub fn canonical_reason(self) -> &'static str {
                match self {
                    $( Self::$variant => $phrase, )+
                }
            }
        }
    };
}

status_codes! {
    /// A registered HTTP status code and its reason phrase.
    ///
    /// Upstream servers may answer with any numeric code, so responses store
    /// the raw `u16`; use [`StatusCode::from_u16`] or [`reason_phrase`] to
    /// name it.
    ///
    /// # Examples
    ///
    /// ```
    /// use httpsource::http::StatusCode;
    ///
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Ok.canonical_reason(), "OK");
    /// assert_eq!(StatusCode::from_u16(418), Some(StatusCode::ImATeapot));
    /// assert_eq!(StatusCode::from_u16(299), None);
    /// ```
    pub enum StatusCode {
        // 1xx Informational
        (100, Continue, "Continue");
        (101, SwitchingProtocols, "Switching Protocols");
        (102, Processing, "Processing");
        (103, EarlyHints, "Early Hints");

        // 2xx Success
        (200, Ok, "OK");
        (201, Created, "Created");
        (202, Accepted, "Accepted");
        (203, NonAuthoritativeInformation, "Non-Authoritative Information");
        (204, NoContent, "No Content");
        (205, ResetContent, "Reset Content");
        (206, PartialContent, "Partial Content");
        (207, MultiStatus, "Multi-Status");
        (208, AlreadyReported, "Already Reported");
        (226, ImUsed, "IM Used");

        // 3xx Redirection
        (300, MultipleChoices, "Multiple Choices");
        (301, MovedPermanently, "Moved Permanently");
        (302, Found, "Found");
        (303, SeeOther, "See Other");
        (304, NotModified, "Not Modified");
        (305, UseProxy, "Use Proxy");
        (307, TemporaryRedirect, "Temporary Redirect");
        (308, PermanentRedirect, "Permanent Redirect");

        // 4xx Client Error
        (400, BadRequest, "Bad Request");
        (401, Unauthorized, "Unauthorized");
        (402, PaymentRequired, "Payment Required");
        (403, Forbidden, "Forbidden");
        (404, NotFound, "Not Found");
        (405, MethodNotAllowed, "Method Not Allowed");
        (406, NotAcceptable, "Not Acceptable");
        (407, ProxyAuthenticationRequired, "Proxy Authentication Required");
        (408, RequestTimeout, "Request Timeout");
        (409, Conflict, "Conflict");
        (410, Gone, "Gone");
        (411, LengthRequired, "Length Required");
        (412, PreconditionFailed, "Precondition Failed");
        (413, PayloadTooLarge, "Payload Too Large");
        (414, UriTooLong, "URI Too Long");
        (415, UnsupportedMediaType, "Unsupported Media Type");
        (416, RangeNotSatisfiable, "Range Not Satisfiable");
        (417, ExpectationFailed, "Expectation Failed");
        (418, ImATeapot, "I'm a Teapot");
        (421, MisdirectedRequest, "Misdirected Request");
        (422, UnprocessableEntity, "Unprocessable Entity");
        (423, Locked, "Locked");
        (424, FailedDependency, "Failed Dependency");
        (425, TooEarly, "Too Early");
        (426, UpgradeRequired, "Upgrade Required");
        (428, PreconditionRequired, "Precondition Required");
        (429, TooManyRequests, "Too Many Requests");
        (431, RequestHeaderFieldsTooLarge, "Request Header Fields Too Large");
        (451, UnavailableForLegalReasons, "Unavailable For Legal Reasons");

        // 5xx Server Error
        (500, InternalServerError, "Internal Server Error");
        (501, NotImplemented, "Not Implemented");
        (502, BadGateway, "Bad Gateway");
        (503, ServiceUnavailable, "Service Unavailable");
        (504, GatewayTimeout, "Gateway Timeout");
        (505, HttpVersionNotSupported, "HTTP Version Not Supported");
        (506, VariantAlsoNegotiates, "Variant Also Negotiates");
        (507, InsufficientStorage, "Insufficient Storage");
        (508, LoopDetected, "Loop Detected");
        (509, BandwidthLimitExceeded, "Bandwidth Limit Exceeded");
        (510, NotExtended, "Not Extended");
        (511, NetworkAuthenticationRequired, "Network Authentication Required");
    }
}

impl StatusCode {
    /// Returns the numeric status code as a `u16`.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Returns the reason phrase for any numeric status, or `"Unknown Status"`.
pub fn reason_phrase(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .map(StatusCode::canonical_reason)
        .unwrap_or("Unknown Status")
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> u16 {
        code.as_u16()
    }
}

/// An HTTP request method supported by the data source.
///
/// # Examples
///
/// ```
/// use httpsource::http::Method;
///
/// let method: Method = "GET".parse().unwrap();
/// assert_eq!(method, Method::Get);
/// assert_eq!(method.as_str(), "GET");
/// assert!("TRACE".parse::<Method>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET: retrieve a representation of the target resource.
    Get,
    /// POST: perform resource-specific processing on the request payload.
    Post,
    /// PUT: replace the target resource's current representation.
    Put,
    /// PATCH: apply partial modifications to a resource.
    Patch,
    /// DELETE: remove the association between the target resource and its functionality.
    Delete,
}

impl Method {
    /// Returns the method as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a method name the data source does not issue.
#[derive(Debug, Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnsupportedMethod(pub String);

impl std::str::FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(UnsupportedMethod(other.to_owned())),
        }
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
