//! Error types returned by the data source.
//!
//! [`Error`] is what callers see. It is `Clone` because a single outcome is
//! shared by every caller waiting on the same memoized call; sources that are
//! not `Clone` (I/O errors) are held in an [`Arc`].

use std::sync::Arc;

use thiserror::Error;

use crate::http::{Request, Response, reason_phrase};

/// A non-success upstream response, or a failure a hook chose to report as one.
///
/// Carries the status code and both the originating request and (when there
/// was one) the response that triggered it. Never mutated after construction.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RequestError {
    message: String,
    code: u16,
    request: Box<Request>,
    response: Option<Box<Response>>,
}

impl RequestError {
    pub fn new(
        message: impl Into<String>,
        code: u16,
        request: Request,
        response: Option<Response>,
    ) -> Self {
        Self {
            message: message.into(),
            code,
            request: Box::new(request),
            response: response.map(Box::new),
        }
    }

    /// The classification error for a response outside `200..=399`.
    ///
    /// The message reads `Response code {status} ({reason phrase})`.
    pub fn from_response(request: &Request, response: Response) -> Self {
        let code = response.status();
        Self::new(
            format!("Response code {code} ({})", reason_phrase(code)),
            code,
            request.clone(),
            Some(response),
        )
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The upstream status code.
    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }
}

/// Connection, timeout and cancellation failures raised by a transport.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("invalid origin {origin}: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("I/O error: {0}")]
    Io(#[source] Arc<std::io::Error>),

    #[error("request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("request was cancelled")]
    Cancelled,

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// A stable, machine-readable code for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidOrigin { .. } => "invalid_origin",
            Self::Connect { .. } => "connect",
            Self::Io(_) => "io",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(Arc::new(err))
    }
}

/// Failure reading or writing the persistent cache. Never surfaced to callers.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cached entry could not be (de)serialized: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Errors returned to callers of the data source.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request body could not be serialized, or a JSON response could not be parsed.
    #[error("body error: {message}")]
    Body { message: String },

    /// A caller hook failed for a reason of its own.
    #[error("hook failed: {message}")]
    Hook { message: String },
}

impl Error {
    pub fn hook(message: impl Into<String>) -> Self {
        Error::Hook {
            message: message.into(),
        }
    }

    /// The upstream status code, for classified response errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Request(e) => Some(e.code()),
            _ => None,
        }
    }

    /// The request that failed, when the error carries it.
    pub fn request(&self) -> Option<&Request> {
        match self {
            Error::Request(e) => Some(e.request()),
            _ => None,
        }
    }

    /// The response that triggered the error, when there was one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Request(e) => e.response(),
            _ => None,
        }
    }

    /// `true` if the live call was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Cancelled))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Body {
            message: err.to_string(),
        }
    }
}
