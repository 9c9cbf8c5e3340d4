//! Fan-out of a single request to every configured endpoint.
//!
//! The engine runs in one of two modes, fixed at construction:
//!
//! - [`DispatchMode::Serial`] visits endpoints in index order and stops at
//!   the first reply whose status the classifier accepts. Endpoints after
//!   the winner are never contacted.
//! - [`DispatchMode::Concurrent`] spawns one task per endpoint, then joins
//!   all of them. Replies land in index-addressed slots, so the winner is
//!   the lowest-indexed accepted reply no matter which finished first.
//!
//! A winning `200` is relayed with its headers and body. Any other accepted
//! status is relayed bare (status only, empty body). When nothing is
//! accepted the client gets `500` and the request is recorded with no
//! winner.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::Instrument;

use super::capture::{CapturedResponse, ResponseCapture};
use super::UpstreamRequest;
use crate::classifier::StatusClassifier;
use crate::endpoints::{Endpoint, EndpointSet};
use crate::telemetry::{DispatchRecord, Telemetry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    #[default]
    Serial,
    Concurrent,
}

impl DispatchMode {
    #[must_use]
    pub const fn from_fanout(fanout: bool) -> Self {
        if fanout {
            Self::Concurrent
        } else {
            Self::Serial
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serial => "serial",
            Self::Concurrent => "concurrent",
        })
    }
}

/// The one response written to the client for a request.
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for ClientResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub response: ClientResponse,
    pub winner: Option<usize>,
    pub elapsed: Duration,
    pub completed: usize,
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        self.response.into_response()
    }
}

/// Everything one unit of work needs to call one endpoint.
struct DispatchTask {
    index: usize,
    endpoint: Endpoint,
    request: Arc<UpstreamRequest>,
    capture: ResponseCapture,
}

impl DispatchTask {
    async fn execute(mut self) -> CapturedResponse {
        self.endpoint
            .forwarder()
            .forward(&self.request, &mut self.capture)
            .await;
        let reply = self.capture.finish();
        tracing::debug!(
            correlation_id = %self.request.correlation_id,
            endpoint = self.index,
            address = %self.endpoint.address(),
            status = reply.status,
            bytes = reply.body.len(),
            "endpoint replied"
        );
        reply
    }
}

pub struct FanoutEngine {
    mode: DispatchMode,
    endpoints: Arc<EndpointSet>,
    classifier: Arc<StatusClassifier>,
    telemetry: Arc<dyn Telemetry>,
}

impl FanoutEngine {
    #[must_use]
    pub fn new(
        mode: DispatchMode,
        endpoints: EndpointSet,
        classifier: StatusClassifier,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            mode,
            endpoints: Arc::new(endpoints),
            classifier: Arc::new(classifier),
            telemetry,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> DispatchMode {
        self.mode
    }

    #[must_use]
    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    #[must_use]
    pub fn classifier(&self) -> &StatusClassifier {
        &self.classifier
    }

    /// Dispatch `request`, select a winner, and produce the client response.
    ///
    /// `base_headers` are the headers already destined for the client; each
    /// capture starts from its own copy of them.
    pub async fn run(&self, request: UpstreamRequest, base_headers: HeaderMap) -> Outcome {
        let start = Instant::now();
        let request = Arc::new(request);

        let (winner, completed) = match self.mode {
            DispatchMode::Serial => self.dispatch_serial(&request, &base_headers).await,
            DispatchMode::Concurrent => self.dispatch_concurrent(&request, &base_headers).await,
        };

        let (response, winner_index) = select_response(winner, base_headers);
        let elapsed = start.elapsed();

        self.telemetry.record(&DispatchRecord {
            method: &request.method,
            uri: &request.uri,
            correlation_id: &request.correlation_id,
            mode: self.mode,
            elapsed,
            winner: winner_index,
            status: response.status,
            completed,
        });

        Outcome {
            response,
            winner: winner_index,
            elapsed,
            completed,
        }
    }

    fn task(
        &self,
        endpoint: &Endpoint,
        request: &Arc<UpstreamRequest>,
        base_headers: &HeaderMap,
    ) -> DispatchTask {
        DispatchTask {
            index: endpoint.index(),
            endpoint: endpoint.clone(),
            request: Arc::clone(request),
            capture: ResponseCapture::new(endpoint.index(), base_headers),
        }
    }

    async fn dispatch_serial(
        &self,
        request: &Arc<UpstreamRequest>,
        base_headers: &HeaderMap,
    ) -> (Option<CapturedResponse>, usize) {
        let mut completed = 0;

        for endpoint in self.endpoints.iter() {
            let reply = self.task(endpoint, request, base_headers).execute().await;
            completed += 1;

            if self.classifier.is_accepted(reply.status) {
                return (Some(reply), completed);
            }
            tracing::debug!(
                correlation_id = %request.correlation_id,
                endpoint = reply.index,
                status = reply.status,
                "reply not accepted, trying next endpoint"
            );
        }

        (None, completed)
    }

    async fn dispatch_concurrent(
        &self,
        request: &Arc<UpstreamRequest>,
        base_headers: &HeaderMap,
    ) -> (Option<CapturedResponse>, usize) {
        let mut tasks = JoinSet::new();
        for endpoint in self.endpoints.iter() {
            tasks.spawn(
                self.task(endpoint, request, base_headers)
                    .execute()
                    .in_current_span(),
            );
        }

        let mut slots: Vec<Option<CapturedResponse>> =
            (0..self.endpoints.len()).map(|_| None).collect();
        let mut completed = 0;

        // Arrival order only fills slots; selection happens after the join.
        while let Some(joined) = tasks.join_next().await {
            completed += 1;
            match joined {
                Ok(reply) => {
                    if let Some(slot) = slots.get_mut(reply.index) {
                        *slot = Some(reply);
                    }
                }
                Err(e) => {
                    tracing::error!(
                        correlation_id = %request.correlation_id,
                        error = %e,
                        "dispatch task failed"
                    );
                }
            }
        }

        let winner = slots
            .into_iter()
            .flatten()
            .find(|reply| self.classifier.is_accepted(reply.status));

        (winner, completed)
    }
}

/// Build the client response, returning the index that actually served it.
///
/// An accepted status that cannot go on the wire falls back to 500 and
/// counts as no winner.
fn select_response(
    winner: Option<CapturedResponse>,
    base_headers: HeaderMap,
) -> (ClientResponse, Option<usize>) {
    let bare = |status, headers| ClientResponse {
        status,
        headers,
        body: Bytes::new(),
    };

    match winner {
        Some(reply) if reply.status == StatusCode::OK.as_u16() => (
            ClientResponse {
                status: StatusCode::OK,
                headers: reply.headers,
                body: reply.body,
            },
            Some(reply.index),
        ),
        Some(reply) => match StatusCode::from_u16(reply.status) {
            Ok(status) => (bare(status, base_headers), Some(reply.index)),
            Err(_) => {
                tracing::warn!(
                    endpoint = reply.index,
                    status = reply.status,
                    "accepted status is not a valid HTTP status"
                );
                (bare(StatusCode::INTERNAL_SERVER_ERROR, base_headers), None)
            }
        },
        None => (bare(StatusCode::INTERNAL_SERVER_ERROR, base_headers), None),
    }
}
