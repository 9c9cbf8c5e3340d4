//! Stand-in response sink for a single upstream call.
//!
//! A [`ResponseCapture`] receives what an endpoint replies (status, headers,
//! body) so the fan-out engine can classify the reply before anything is
//! sent to the real client. Status follows HTTP/1 writer semantics: the
//! first body write without a prior status commits `200 OK`.

use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};

#[derive(Debug)]
pub struct ResponseCapture {
    index: usize,
    status: u16,
    headers: HeaderMap,
    body: BytesMut,
    body_started: bool,
}

/// Final, read-only view of a finished capture.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub index: usize,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ResponseCapture {
    /// Start a capture for endpoint `index`, seeded with a private copy of
    /// `base` (the headers already destined for the client).
    #[must_use]
    pub fn new(index: usize, base: &HeaderMap) -> Self {
        Self {
            index,
            status: 0,
            headers: base.clone(),
            body: BytesMut::new(),
            body_started: false,
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Status so far; 0 until set explicitly or by the first write.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Record an explicit status. Ignored once the body has started.
    pub fn set_status(&mut self, code: u16) {
        if self.body_started {
            tracing::debug!(
                endpoint = self.index,
                status = self.status,
                ignored = code,
                "status set after body write, ignoring"
            );
            return;
        }
        self.status = code;
    }

    /// Append body bytes, committing `200` if no status was set.
    pub fn write(&mut self, chunk: &[u8]) -> usize {
        if self.status == 0 {
            self.status = 200;
        }
        self.body_started = true;
        self.body.extend_from_slice(chunk);
        chunk.len()
    }

    /// Abandon whatever the endpoint sent and record a gateway failure.
    ///
    /// Unlike [`set_status`](Self::set_status) this overrides a committed
    /// status and drops any body bytes already written.
    pub fn fail(&mut self, code: u16) {
        self.status = code;
        self.body.clear();
        self.body_started = false;
    }

    #[must_use]
    pub fn finish(self) -> CapturedResponse {
        CapturedResponse {
            index: self.index,
            status: self.status,
            headers: self.headers,
            body: self.body.freeze(),
        }
    }
}
