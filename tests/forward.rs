//! Integration tests for the reverse-proxy forwarding primitive.

mod common;

use std::time::Duration;

use axum::http::{HeaderMap, Method, Uri};
use axum::Router;
use bytes::Bytes;
use url::Url;

use common::{closed_port, serve, truncated_upstream, upstream};
use fanout_balancer::proxy::capture::{CapturedResponse, ResponseCapture};
use fanout_balancer::proxy::forward::{Forward, ReverseProxy};
use fanout_balancer::proxy::UpstreamRequest;
use fanout_balancer::server;

fn request(method: Method, uri: &'static str, body: &'static [u8]) -> UpstreamRequest {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
    headers.insert("connection", "keep-alive".parse().unwrap());
    UpstreamRequest {
        method,
        uri: Uri::from_static(uri),
        headers,
        body: Bytes::from_static(body),
        client_ip: Some("10.0.0.9".into()),
        correlation_id: "corr-42".into(),
    }
}

async fn forward_to(base: &str, req: &UpstreamRequest, timeout_ms: u64) -> CapturedResponse {
    let proxy = ReverseProxy::new(
        Url::parse(base).unwrap(),
        server::build_http_client(),
        Duration::from_millis(timeout_ms),
    );
    let mut capture = ResponseCapture::new(0, &HeaderMap::new());
    proxy.forward(req, &mut capture).await;
    capture.finish()
}

/// Echoes what it received: method, URI, selected headers, and body.
async fn echo() -> String {
    let router = Router::new().fallback(
        |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| async move {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-")
                    .to_string()
            };
            (
                [("x-upstream", "echo")],
                format!(
                    "{method} {uri}|xff={}|via={}|cid={}|conn={}|{}",
                    header("x-forwarded-for"),
                    header("via"),
                    header("x-correlation-id"),
                    header("connection"),
                    String::from_utf8_lossy(&body),
                ),
            )
        },
    );
    format!("http://{}", serve(router).await)
}

#[tokio::test]
async fn forwards_method_path_headers_and_body() {
    let base = format!("{}/api", echo().await);
    let req = request(Method::POST, "/items?page=2", b"payload");

    let reply = forward_to(&base, &req, 2000).await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.headers.get("x-upstream").unwrap(), "echo");
    let body = String::from_utf8(reply.body.to_vec()).unwrap();
    assert!(body.starts_with("POST /api/items?page=2|"), "{body}");
    assert!(body.contains("xff=1.2.3.4, 10.0.0.9"), "{body}");
    assert!(body.contains("via=1.1 fanout-balancer"), "{body}");
    assert!(body.contains("cid=corr-42"), "{body}");
    assert!(body.ends_with("|payload"), "{body}");
    assert!(!body.contains("conn=keep-alive"), "{body}");
}

#[tokio::test]
async fn relays_upstream_status_and_body() {
    let base = upstream(418, "teapot", 0).await;
    let reply = forward_to(&base, &request(Method::GET, "/", b""), 2000).await;

    assert_eq!(reply.status, 418);
    assert_eq!(reply.body, Bytes::from_static(b"teapot"));
    assert!(reply.headers.get("content-length").is_none());
}

#[tokio::test]
async fn head_reply_keeps_upstream_length() {
    let base = upstream(200, "hello!", 0).await;
    let reply = forward_to(&base, &request(Method::HEAD, "/", b""), 2000).await;

    assert_eq!(reply.status, 200);
    assert!(reply.body.is_empty());
    assert_eq!(reply.headers.get("content-length").unwrap(), "6");
}

#[tokio::test]
async fn refused_connection_becomes_bad_gateway() {
    let base = closed_port().await;
    let reply = forward_to(&base, &request(Method::GET, "/", b""), 2000).await;

    assert_eq!(reply.status, 502);
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn slow_upstream_becomes_gateway_timeout() {
    let base = upstream(200, "late", 500).await;
    let reply = forward_to(&base, &request(Method::GET, "/", b""), 50).await;

    assert_eq!(reply.status, 504);
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn body_cut_short_becomes_bad_gateway() {
    let base = truncated_upstream(true).await;
    let reply = forward_to(&base, &request(Method::GET, "/", b""), 2000).await;

    assert_eq!(reply.status, 502);
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn stalled_body_becomes_gateway_timeout() {
    let base = truncated_upstream(false).await;
    let reply = forward_to(&base, &request(Method::GET, "/", b""), 200).await;

    assert_eq!(reply.status, 504);
    assert!(reply.body.is_empty());
}
