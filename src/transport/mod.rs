//! The HTTP transport seam.
//!
//! The pipeline only needs one operation from the network: send a request
//! and hand back status, headers and body bytes. Connection handling, TLS and
//! timeouts belong to the [`Transport`] implementation. [`TcpTransport`] is a
//! minimal plain-HTTP/1.1 implementation; hosts with richer needs plug in
//! their own client.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::http::{Headers, Request};

pub mod tcp;

pub use tcp::TcpTransport;

/// An unclassified upstream response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

/// Executes one HTTP exchange.
///
/// Implementations receive a request whose body has already been serialized
/// and whose path already carries the canonical query string.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<RawResponse, TransportError>;
}

/// Runs `transport`, failing with [`TransportError::Cancelled`] as soon as the
/// request's cancellation token fires.
pub async fn execute_cancellable(
    transport: &dyn Transport,
    request: &Request,
) -> Result<RawResponse, TransportError> {
    match request.cancel_token() {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(TransportError::Cancelled),
            result = transport.execute(request) => result,
        },
        None => transport.execute(request).await,
    }
}
