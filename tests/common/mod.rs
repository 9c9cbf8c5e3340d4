//! Shared helpers: throwaway upstreams and a balancer bound to 127.0.0.1:0.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use fanout_balancer::classifier::StatusClassifier;
use fanout_balancer::endpoints::EndpointSet;
use fanout_balancer::proxy::fanout::{DispatchMode, FanoutEngine};
use fanout_balancer::proxy::forward::ReverseProxy;
use fanout_balancer::server::{self, AppState, DEFAULT_MAX_BODY};
use fanout_balancer::telemetry::TracingTelemetry;

pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// An upstream that always answers `status` with `body`, after `delay_ms`.
pub async fn upstream(status: u16, body: &'static str, delay_ms: u64) -> String {
    let router = Router::new().fallback(move || async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        (StatusCode::from_u16(status).unwrap(), body)
    });
    format!("http://{}", serve(router).await)
}

/// A raw upstream that promises 100 body bytes, sends 7, then either
/// closes the connection (`close`) or stalls with it open.
pub async fn truncated_upstream(close: bool) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut seen = Vec::new();
                let mut buf = [0u8; 1024];
                while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => seen.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial")
                    .await;
                let _ = stream.flush().await;
                if !close {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                }
            });
        }
    });
    format!("http://{addr}")
}

/// An address nothing listens on.
pub async fn closed_port() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub struct Balancer {
    pub addr: SocketAddr,
    pub telemetry: Arc<TracingTelemetry>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl Balancer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for Balancer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn start_balancer(
    endpoints: &[String],
    mode: DispatchMode,
    terminal: &str,
    timeout_ms: u64,
) -> Balancer {
    let client = server::build_http_client();
    let endpoints = EndpointSet::from_tokens(
        endpoints,
        ReverseProxy::binder(client, Duration::from_millis(timeout_ms)),
    )
    .unwrap();

    let telemetry = Arc::new(TracingTelemetry::new());
    let engine = FanoutEngine::new(
        mode,
        endpoints,
        StatusClassifier::new(terminal).unwrap(),
        telemetry.clone(),
    );
    let router = server::build_router(
        Arc::new(AppState {
            engine,
            span: tracing::Span::none(),
        }),
        DEFAULT_MAX_BODY,
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    Balancer {
        addr,
        telemetry,
        shutdown: Some(shutdown_tx),
    }
}
