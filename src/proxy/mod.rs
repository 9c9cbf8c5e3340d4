//! Core HTTP forwarding handler.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every request, buffers it into an [`UpstreamRequest`], and hands it to
//! the fan-out engine. Submodules handle reply capture ([`capture`]),
//! header construction ([`headers`]), the per-endpoint forwarding
//! primitive ([`forward`]), and winner selection ([`fanout`]).

pub mod capture;
pub mod fanout;
pub mod forward;
pub mod headers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use tracing::Instrument;

use crate::server::AppState;
use headers::CORRELATION_HEADER;

/// A fully buffered inbound request, shared read-only by every upstream call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_ip: Option<String>,
    pub correlation_id: String,
}

pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = req_headers
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    tracing::debug!(
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
        "request received"
    );

    let mut base_headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        base_headers.insert(CORRELATION_HEADER, value);
    }

    let request = UpstreamRequest {
        method,
        uri,
        headers: req_headers,
        body,
        client_ip: Some(addr.ip().to_string()),
        correlation_id,
    };

    state
        .engine
        .run(request, base_headers)
        .instrument(state.span.clone())
        .await
        .into_response()
}
