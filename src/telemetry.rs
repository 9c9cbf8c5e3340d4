//! Per-request outcome telemetry.
//!
//! The fan-out engine reports one [`DispatchRecord`] per request to an
//! injected [`Telemetry`] handle. [`TracingTelemetry`] is the production
//! handle: it logs each record through `tracing` and keeps served/failed
//! counters that are reported when the server stops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::http::{Method, StatusCode, Uri};

use crate::proxy::fanout::DispatchMode;

#[derive(Debug, Clone)]
pub struct DispatchRecord<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub correlation_id: &'a str,
    pub mode: DispatchMode,
    /// Wall-clock time spent dispatching and selecting.
    pub elapsed: Duration,
    pub winner: Option<usize>,
    pub status: StatusCode,
    /// Upstream calls that ran to completion for this request.
    pub completed: usize,
}

impl DispatchRecord<'_> {
    /// Winning endpoint index, or -1 when no endpoint was accepted.
    #[must_use]
    pub fn winner_index(&self) -> i64 {
        self.winner
            .and_then(|i| i64::try_from(i).ok())
            .unwrap_or(-1)
    }
}

pub trait Telemetry: Send + Sync {
    fn record(&self, record: &DispatchRecord<'_>);
}

#[derive(Debug, Default)]
pub struct Stats {
    pub served: AtomicU64,
    pub failed: AtomicU64,
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            served: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Default)]
pub struct TracingTelemetry {
    stats: Stats,
}

impl TracingTelemetry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stats: Stats::new(),
        }
    }

    #[must_use]
    pub const fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl Telemetry for TracingTelemetry {
    #[allow(clippy::cast_possible_truncation)]
    fn record(&self, record: &DispatchRecord<'_>) {
        let elapsed_ms = record.elapsed.as_millis() as u64;

        if record.winner.is_some() {
            self.stats.served.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                correlation_id = %record.correlation_id,
                uri = %record.uri,
                status = record.status.as_u16(),
                "endpoints failed to return a valid answer"
            );
        }

        tracing::info!(
            correlation_id = %record.correlation_id,
            method = %record.method,
            uri = %record.uri,
            mode = %record.mode,
            endpoint = record.winner_index(),
            status = record.status.as_u16(),
            completed = record.completed,
            elapsed_ms,
            "request served"
        );
    }
}
