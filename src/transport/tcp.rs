//! Plain HTTP/1.1 transport over Tokio TCP streams.
//!
//! One connection per request, sent with `Connection: close`. The response
//! body is framed by `Content-Length`, or by the peer closing the connection
//! when the header is absent. `https://` origins and chunked transfer coding
//! are rejected.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

use super::{RawResponse, Transport};
use crate::error::TransportError;
use crate::http::{Body, Headers, Request};

/// Maximum size of a complete HTTP response we will buffer (8 MiB).
const MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// Maximum number of response headers we parse.
const MAX_HEADERS: usize = 64;

/// Headers the transport writes itself; caller values are dropped.
const MANAGED_HEADERS: [&str; 3] = ["host", "content-length", "connection"];

/// A minimal HTTP/1.1 client transport.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use httpsource::{DataSource, TcpTransport};
///
/// # async fn run() -> Result<(), httpsource::Error> {
/// let transport = TcpTransport::new().with_timeout(Duration::from_secs(5));
/// let source = DataSource::builder("http://127.0.0.1:8080")
///     .transport(Arc::new(transport))
///     .build();
/// let response = source.get("/health", Default::default()).await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    /// Default time allowed for a whole exchange.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the time allowed for connect, send and receive combined.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn round_trip(&self, request: &Request) -> Result<RawResponse, TransportError> {
        let target = Target::parse(request.origin())?;
        let body = wire_body(request.body())?;

        let mut stream = TcpStream::connect(&target.addr)
            .await
            .map_err(|e| TransportError::Connect {
                addr: target.addr.clone(),
                source: Arc::new(e),
            })?;

        debug!(
            addr = %target.addr,
            method = %request.method(),
            path = %request.path(),
            "sending request"
        );

        stream
            .write_all(&encode_request(request, &target.host, &body))
            .await?;
        stream.flush().await?;

        let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

        let head = loop {
            let bytes_read = stream.read_buf(&mut buf).await?;

            if let Some(head) = parse_head(&buf)? {
                break head;
            }
            if bytes_read == 0 {
                return Err(TransportError::InvalidResponse(
                    "connection closed before response headers".into(),
                ));
            }
            ensure_size(buf.len())?;
        };

        if head
            .headers
            .get("transfer-encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
        {
            return Err(TransportError::InvalidResponse(
                "chunked transfer coding is not supported".into(),
            ));
        }

        let content_length = head
            .headers
            .get("content-length")
            .map(|v| v.trim().parse::<usize>())
            .transpose()
            .map_err(|_| TransportError::InvalidResponse("invalid Content-Length".into()))?;

        // Drop the header bytes; what remains is the start of the body.
        let _ = buf.split_to(head.body_offset);

        match content_length {
            Some(len) => {
                ensure_size(len)?;
                while buf.len() < len {
                    if stream.read_buf(&mut buf).await? == 0 {
                        return Err(TransportError::InvalidResponse(
                            "connection closed before body completed".into(),
                        ));
                    }
                }
                buf.truncate(len);
            }
            None => {
                while stream.read_buf(&mut buf).await? != 0 {
                    ensure_size(buf.len())?;
                }
            }
        }

        debug!(addr = %target.addr, status = head.status, bytes = buf.len(), "response received");

        Ok(RawResponse {
            status: head.status,
            headers: head.headers,
            body: buf.freeze(),
        })
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn execute(&self, request: &Request) -> Result<RawResponse, TransportError> {
        match tokio::time::timeout(self.timeout, self.round_trip(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

// Where to connect and what to send as `Host`.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    addr: String,
    host: String,
}

impl Target {
    fn parse(origin: &str) -> Result<Self, TransportError> {
        let invalid = |reason: &str| TransportError::InvalidOrigin {
            origin: origin.to_owned(),
            reason: reason.to_owned(),
        };

        let url = Url::parse(origin).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid("only http:// origins are supported"));
        }
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
        let port = url.port_or_known_default().unwrap_or(80);

        Ok(Self {
            addr: format!("{host}:{port}"),
            host: match url.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_owned(),
            },
        })
    }
}

struct Head {
    status: u16,
    headers: Headers,
    body_offset: usize,
}

fn ensure_size(len: usize) -> Result<(), TransportError> {
    if len > MAX_RESPONSE_SIZE {
        return Err(TransportError::InvalidResponse(format!(
            "response exceeds {MAX_RESPONSE_SIZE} bytes"
        )));
    }
    Ok(())
}

fn wire_body(body: &Body) -> Result<Bytes, TransportError> {
    match body {
        Body::Empty => Ok(Bytes::new()),
        Body::Bytes(bytes) => Ok(bytes.clone()),
        Body::Json(value) => serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| TransportError::InvalidResponse(format!("unserializable body: {e}"))),
    }
}

/// Serializes the request head and body in HTTP/1.1 wire format.
fn encode_request(request: &Request, host: &str, body: &[u8]) -> BytesMut {
    let estimated_size = 128 + request.headers().len() * 64 + body.len();
    let mut buf = BytesMut::with_capacity(estimated_size);

    // Request line
    buf.put(format!("{} {} HTTP/1.1\r\n", request.method(), request.path()).as_bytes());

    buf.put(format!("Host: {host}\r\n").as_bytes());

    for (name, value) in request.headers().iter() {
        if MANAGED_HEADERS.iter().any(|m| name.eq_ignore_ascii_case(m)) {
            continue;
        }
        buf.put(format!("{name}: {value}\r\n").as_bytes());
    }

    if !body.is_empty() {
        buf.put(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    buf.put(&b"Connection: close\r\n\r\n"[..]);

    if !body.is_empty() {
        buf.put(body);
    }

    buf
}

/// Parses the status line and headers, returning `None` until they are complete.
fn parse_head(buf: &[u8]) -> Result<Option<Head>, TransportError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut raw = httparse::Response::new(&mut headers);

    let body_offset = match raw
        .parse(buf)
        .map_err(|e| TransportError::InvalidResponse(e.to_string()))?
    {
        httparse::Status::Complete(offset) => offset,
        httparse::Status::Partial => return Ok(None),
    };

    let status = raw
        .code
        .ok_or_else(|| TransportError::InvalidResponse("missing status code".into()))?;

    let mut header_map = Headers::with_capacity(raw.headers.len());
    for header in raw.headers.iter() {
        let value = String::from_utf8_lossy(header.value);
        if let Cow::Owned(_) = value {
            debug!(header = header.name, "non-UTF-8 header value kept lossily");
        }
        header_map.insert(header.name, value);
    }

    Ok(Some(Head {
        status,
        headers: header_map,
        body_offset,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, RequestOptions};

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn target_defaults_to_port_80() {
        let t = Target::parse("http://example.com").unwrap();
        assert_eq!(t.addr, "example.com:80");
        assert_eq!(t.host, "example.com");

        let t = Target::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(t.addr, "127.0.0.1:8080");
        assert_eq!(t.host, "127.0.0.1:8080");
    }

    #[test]
    fn https_is_rejected() {
        assert!(matches!(
            Target::parse("https://example.com"),
            Err(TransportError::InvalidOrigin { .. })
        ));
        assert!(Target::parse("not a url").is_err());
    }

    #[test]
    fn encodes_get_without_body() {
        let options = RequestOptions::new().header("Accept", "application/json").query("a", 1);
        let req = Request::new(Method::Get, "http://h", "/items", options);
        let s = to_string(encode_request(&req, "h", &[]));
        assert!(s.starts_with("GET /items?a=1 HTTP/1.1\r\nHost: h\r\n"));
        assert!(s.contains("Accept: application/json\r\n"));
        assert!(!s.contains("Content-Length"));
        assert!(s.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn encodes_body_with_length_and_drops_managed_headers() {
        let options = RequestOptions::new()
            .header("Connection", "keep-alive")
            .header("Content-Length", "999");
        let req = Request::new(Method::Post, "http://h", "/", options);
        let s = to_string(encode_request(&req, "h", b"hello"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(!s.contains("999"));
        assert!(!s.contains("keep-alive"));
        assert!(s.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn non_utf8_header_values_are_kept() {
        let raw = b"HTTP/1.1 200 OK\r\nX-Name: caf\xe9\r\nX-Plain: ok\r\n\r\n";
        let head = parse_head(raw).unwrap().expect("complete head");
        assert_eq!(head.headers.len(), 2);
        assert_eq!(head.headers.get("x-name"), Some("caf\u{FFFD}"));
        assert_eq!(head.headers.get("x-plain"), Some("ok"));
    }

    #[test]
    fn parse_head_complete_and_partial() {
        let raw = b"HTTP/1.1 203 Non-Authoritative Information\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nok";
        let head = parse_head(raw).unwrap().expect("complete head");
        assert_eq!(head.status, 203);
        assert_eq!(head.headers.get("content-type"), Some("text/plain"));
        assert_eq!(&raw[head.body_offset..], b"ok");

        assert!(parse_head(b"HTTP/1.1 200 OK\r\nContent-").unwrap().is_none());
        assert!(parse_head(b"garbage\r\n\r\n").is_err());
    }
}
