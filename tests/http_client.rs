//! Request client against a local HTTP server.

#![cfg(feature = "client")]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use rpc_http_transport::prelude::*;
use tokio::net::TcpListener;

/// Echo the body back, refusing anything not sent as a form post.
async fn echo(headers: HeaderMap, body: Bytes) -> Result<Vec<u8>, StatusCode> {
    let content_type = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok());
    if content_type != Some("application/x-www-form-urlencoded") {
        return Err(StatusCode::BAD_REQUEST);
    }
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if content_length != Some(body.len()) {
        return Err(StatusCode::LENGTH_REQUIRED);
    }
    Ok(body.to_vec())
}

/// Never answers within the test.
async fn stall() -> Vec<u8> {
    tokio::time::sleep(Duration::from_secs(30)).await;
    Vec::new()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn serve() -> SocketAddr {
    init_tracing();
    let router = Router::new()
        .route("/api", post(echo))
        .route("/stall", post(stall));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn request(url: String, body: Vec<u8>) -> HttpRequest {
    HttpRequest {
        url,
        content_type: "application/x-www-form-urlencoded",
        body,
    }
}

#[tokio::test]
async fn test_success_returns_body() {
    let addr = serve().await;
    let (mut client, mut completions) = HttpClient::builder().build().unwrap();

    let body = hex::decode("0000000000000000deadbeef").unwrap();
    let id = client.post(request(format!("http://{addr}/api"), body.clone()));

    let completion = completions.recv().await.unwrap();
    assert_eq!(completion.id, id);
    assert_eq!(completion.outcome, Ok(body));
}

#[tokio::test]
async fn test_http_status_is_reported() {
    let addr = serve().await;
    let (mut client, mut completions) = HttpClient::builder().build().unwrap();

    let id = client.post(request(format!("http://{addr}/missing"), vec![0; 12]));

    let completion = completions.recv().await.unwrap();
    assert_eq!(completion.id, id);
    let failure = completion.outcome.unwrap_err();
    assert_eq!(failure.status, Some(404));
    assert_eq!(failure.kind, FailureKind::Content);
    assert_eq!(failure.code(), -404);
}

#[tokio::test]
async fn test_refused_connection_has_no_status() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (mut client, mut completions) = HttpClient::builder().build().unwrap();
    client.post(request(format!("http://{addr}/api"), vec![0; 12]));

    let failure = completions.recv().await.unwrap().outcome.unwrap_err();
    assert_eq!(failure.status, None);
    assert_eq!(failure.kind, FailureKind::ConnectionRefused);
    assert_eq!(failure.code(), -999);
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let addr = serve().await;
    let (mut client, mut completions) = HttpClient::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    client.post(request(format!("http://{addr}/stall"), vec![0; 12]));

    let failure = completions.recv().await.unwrap().outcome.unwrap_err();
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.code(), -999);
}

#[tokio::test]
async fn test_aborted_request_never_completes() {
    let addr = serve().await;
    let (mut client, mut completions) = HttpClient::builder().build().unwrap();

    let stalled = client.post(request(format!("http://{addr}/stall"), vec![0; 12]));
    client.abort(stalled);
    let echoed = client.post(request(format!("http://{addr}/api"), vec![1; 8]));

    let completion = completions.recv().await.unwrap();
    assert_eq!(completion.id, echoed);

    let late = tokio::time::timeout(Duration::from_millis(300), completions.recv()).await;
    assert!(late.is_err(), "aborted request delivered a completion");
}

#[tokio::test]
async fn test_connection_over_http_client_rejects_short_buffer() {
    init_tracing();
    let (client, _completions) = HttpClient::builder().build().unwrap();
    let (mut conn, mut events) =
        HttpConnection::new(client, ReqPqCodec::new(), &mut rand::rngs::OsRng);

    assert_eq!(conn.send(&[1, 2]), Err(TransportError::Framing { len: 8 }));
    assert_eq!(events.recv().await, Some(TransportEvent::Error(-999)));
    assert_eq!(conn.client().in_flight(), 0);
}

#[tokio::test]
async fn test_disconnect_detaches_client() {
    let addr = serve().await;
    let (client, mut completions) = HttpClient::builder().build().unwrap();
    let (mut conn, mut events) =
        HttpConnection::new(client, ReqPqCodec::new(), &mut rand::rngs::OsRng);

    // Handshake goes to port 80; the round trip below is issued directly.
    conn.client_mut()
        .post(request(format!("http://{addr}/stall"), vec![0; 12]));
    conn.disconnect();
    conn.client_mut()
        .post(request(format!("http://{addr}/api"), vec![0; 12]));

    let closed = tokio::time::timeout(Duration::from_secs(2), completions.recv()).await;
    assert_eq!(closed, Ok(None));
    assert!(events.try_recv().is_err());
}
