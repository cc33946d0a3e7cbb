//! `TcpTransport` against a real loopback listener.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use httpsource::{
    DataSource, Error, Method, Request, RequestOptions, ResponseBody, TcpTransport, Transport,
    TransportError,
};

/// Accepts one connection, records the raw request and replies with `reply`.
async fn serve_once(reply: &'static [u8]) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let received = read_request(&mut stream).await;
        stream.write_all(reply).await.unwrap();
        stream.shutdown().await.unwrap();
        received
    });

    (origin, handle)
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn content_length_framed_json_through_the_pipeline() {
    let (origin, server) = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 14\r\n\r\n{\"name\":\"foo\"}",
    )
    .await;

    let ds = DataSource::new(origin.clone());
    let response = ds
        .get("/users", RequestOptions::new().query("id", 7))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), &ResponseBody::Json(json!({ "name": "foo" })));
    assert_eq!(response.headers().get("content-length"), Some("14"));

    let received = server.await.unwrap();
    let host = origin.trim_start_matches("http://");
    assert!(received.starts_with("GET /users?id=7 HTTP/1.1\r\n"));
    assert!(received.contains(&format!("Host: {host}\r\n")));
    assert!(received.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn request_body_is_sent_with_its_length() {
    let (origin, server) = serve_once(b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n").await;

    let ds = DataSource::new(origin);
    let response = ds
        .post("/items", RequestOptions::new().json(json!({ "a": 1 })))
        .await
        .unwrap();

    assert_eq!(response.status(), 201);
    assert_eq!(response.body(), &ResponseBody::Empty);

    let received = server.await.unwrap();
    assert!(received.starts_with("POST /items HTTP/1.1\r\n"));
    assert!(received.contains("Content-Length: 7\r\n"));
    assert!(received.contains("content-type: application/json; charset=utf-8\r\n"));
    assert!(received.ends_with("\r\n\r\n{\"a\":1}"));
}

#[tokio::test]
async fn body_without_length_runs_to_connection_close() {
    let (origin, _server) =
        serve_once(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhello world").await;

    let request = Request::new(Method::Get, origin, "/", RequestOptions::new());
    let raw = TcpTransport::new().execute(&request).await.unwrap();

    assert_eq!(raw.status, 200);
    assert_eq!(raw.body.as_ref(), b"hello world");
}

#[tokio::test]
async fn error_status_is_classified() {
    let (origin, _server) = serve_once(
        b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\nnope",
    )
    .await;

    let err = DataSource::new(origin)
        .get("/missing", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert_eq!(err.to_string(), "Response code 404 (Not Found)");
    let body = err.response().map(|r| r.body().clone());
    assert_eq!(body, Some(ResponseBody::Text("nope".into())));
}

#[tokio::test]
async fn chunked_responses_are_rejected() {
    let (origin, _server) = serve_once(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
    )
    .await;

    let request = Request::new(Method::Get, origin, "/", RequestOptions::new());
    let err = TcpTransport::new().execute(&request).await.unwrap_err();
    assert!(matches!(err, TransportError::InvalidResponse(_)));
}

#[tokio::test]
async fn silent_peer_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let _server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(stream);
    });

    let transport = TcpTransport::new().with_timeout(Duration::from_millis(50));
    let ds = DataSource::builder(origin)
        .transport(Arc::new(transport))
        .build();

    let err = ds.post("/", RequestOptions::new()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Timeout { timeout_ms: 50 })
    ));
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let request = Request::new(Method::Get, origin, "/", RequestOptions::new());
    let err = TcpTransport::new().execute(&request).await.unwrap_err();
    assert_eq!(err.kind(), "connect");
}
