//! The forwarding primitive: sends one request to one endpoint.
//!
//! [`Forward`] is the seam between the fan-out engine and the transport.
//! Implementations never fail outward; transport problems are reported
//! as statuses in the capture (502 for connection or protocol errors, 504
//! when the endpoint does not answer in time), so the engine treats them
//! like any other rejected reply. A body cut short after the headers is a
//! failure too: the partial bytes are dropped, never relayed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::{StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use url::Url;

use super::capture::ResponseCapture;
use super::headers::{build_forwarded_headers, strip_response_hop_by_hop};
use super::UpstreamRequest;
use crate::server::HttpClient;

/// Default per-call upstream timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

// async_trait is required here because endpoints hold Arc<dyn Forward>
// and native async fn in traits does not support dyn dispatch.
#[async_trait]
pub trait Forward: Send + Sync {
    async fn forward(&self, request: &UpstreamRequest, capture: &mut ResponseCapture);
}

/// Single-host reverse proxy bound to one endpoint address.
pub struct ReverseProxy {
    target: Url,
    client: HttpClient,
    timeout: Duration,
}

impl ReverseProxy {
    #[must_use]
    pub const fn new(target: Url, client: HttpClient, timeout: Duration) -> Self {
        Self {
            target,
            client,
            timeout,
        }
    }

    /// A binder for [`EndpointSet::parse`](crate::endpoints::EndpointSet::parse)
    /// that gives every endpoint its own proxy over a shared client.
    pub fn binder(client: HttpClient, timeout: Duration) -> impl FnMut(&Url) -> Arc<dyn Forward> {
        move |url: &Url| -> Arc<dyn Forward> {
            Arc::new(Self::new(url.clone(), client.clone(), timeout))
        }
    }
}

#[async_trait]
impl Forward for ReverseProxy {
    #[allow(clippy::cast_possible_truncation)]
    async fn forward(&self, request: &UpstreamRequest, capture: &mut ResponseCapture) {
        let endpoint = capture.index();
        let uri = target_uri(&self.target, &request.uri);
        let headers = build_forwarded_headers(
            &request.headers,
            request.client_ip.as_deref(),
            &self.target,
            &request.correlation_id,
        );

        let mut req_builder = hyper::Request::builder()
            .method(request.method.clone())
            .uri(uri.as_str());
        for (key, value) in &headers {
            req_builder = req_builder.header(key, value);
        }

        let outbound = match req_builder.body(Full::new(request.body.clone())) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(endpoint, target = %uri, error = %e, "failed to build upstream request");
                capture.set_status(StatusCode::BAD_GATEWAY.as_u16());
                return;
            }
        };

        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.timeout;

        let response =
            match tokio::time::timeout_at(deadline, self.client.request(outbound)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!(
                        endpoint,
                        target = %uri,
                        error = %e,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "upstream request failed"
                    );
                    capture.set_status(StatusCode::BAD_GATEWAY.as_u16());
                    return;
                }
                Err(_) => {
                    tracing::warn!(
                        endpoint,
                        target = %uri,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "upstream request timed out"
                    );
                    capture.set_status(StatusCode::GATEWAY_TIMEOUT.as_u16());
                    return;
                }
            };

        let (mut parts, mut body) = response.into_parts();
        capture.set_status(parts.status.as_u16());

        strip_response_hop_by_hop(&mut parts.headers, &request.method);
        for (name, value) in &parts.headers {
            capture.headers_mut().append(name.clone(), value.clone());
        }

        loop {
            match tokio::time::timeout_at(deadline, body.frame()).await {
                Ok(Some(Ok(frame))) => {
                    if let Ok(data) = frame.into_data() {
                        capture.write(&data);
                    }
                }
                Ok(Some(Err(e))) => {
                    tracing::warn!(endpoint, target = %uri, error = %e, "upstream body read failed");
                    capture.fail(StatusCode::BAD_GATEWAY.as_u16());
                    return;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        endpoint,
                        target = %uri,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "upstream body timed out"
                    );
                    capture.fail(StatusCode::GATEWAY_TIMEOUT.as_u16());
                    return;
                }
            }
        }

        tracing::debug!(
            endpoint,
            target = %uri,
            status = capture.status(),
            latency_ms = start.elapsed().as_millis() as u64,
            "upstream responded"
        );
    }
}

/// Map an inbound request URI onto the endpoint's base address.
///
/// Paths are joined with exactly one slash; the endpoint's own query is
/// kept and the request query is appended after it.
fn target_uri(target: &Url, request: &Uri) -> Url {
    let mut url = target.clone();
    url.set_fragment(None);
    url.set_path(&join_paths(target.path(), request.path()));

    let query = match (target.query().filter(|q| !q.is_empty()), request.query()) {
        (Some(base), Some(extra)) if !extra.is_empty() => Some(format!("{base}&{extra}")),
        (Some(base), _) => Some(base.to_string()),
        (None, Some(extra)) if !extra.is_empty() => Some(extra.to_string()),
        (None, _) => None,
    };
    url.set_query(query.as_deref());

    url
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
