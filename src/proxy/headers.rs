//! Header construction, forwarding, and hop-by-hop stripping.
//!
//! [`build_forwarded_headers`] clones the original client headers, strips
//! hop-by-hop headers, rewrites `Host` for the endpoint, and adds proxy
//! metadata (`X-Forwarded-For`, `X-Real-IP`, `X-Forwarded-Proto`,
//! `X-Forwarded-Host`, `Via`, `X-Correlation-Id`).

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};

pub const CORRELATION_HEADER: &str = "x-correlation-id";

const VIA: &str = "1.1 fanout-balancer";

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip hop-by-hop headers and `content-length` from an upstream response.
///
/// The body is re-buffered in a capture before it reaches the client, so
/// the origin's framing headers no longer apply. Axum sets the correct
/// `content-length` from the relayed bytes. A reply to `HEAD` has no body
/// to measure, so its `content-length` is the origin's and is kept.
pub fn strip_response_hop_by_hop(headers: &mut HeaderMap, method: &Method) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    if *method != Method::HEAD {
        headers.remove(hyper::header::CONTENT_LENGTH);
    }
}

pub fn build_forwarded_headers(
    original: &HeaderMap,
    client_ip: Option<&str>,
    target_url: &url::Url,
    correlation_id: &str,
) -> HeaderMap {
    let mut headers = original.clone();

    for header_name in HOP_BY_HOP.iter() {
        headers.remove(header_name);
    }
    // Body is re-sent from a buffer; hyper derives the length from it.
    headers.remove(hyper::header::CONTENT_LENGTH);

    // Rewrite Host
    if let Some(host) = target_url.host_str() {
        let host_value = target_url
            .port()
            .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
        if let Ok(val) = HeaderValue::from_str(&host_value) {
            headers.insert("host", val);
        }
    }

    // X-Forwarded-For: append to chain
    if let Some(client_ip) = client_ip {
        let xff = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || client_ip.to_string(),
                |existing| format!("{existing}, {client_ip}"),
            );
        if let Ok(val) = HeaderValue::from_str(&xff) {
            headers.insert("x-forwarded-for", val);
        }

        // X-Real-IP (first IP in chain)
        let real_ip = xff.split(',').next().unwrap_or(client_ip).trim();
        if let Ok(val) = HeaderValue::from_str(real_ip) {
            headers.insert("x-real-ip", val);
        }
    }

    let proto = if target_url.scheme() == "https" {
        "https"
    } else {
        "http"
    };
    headers.insert("x-forwarded-proto", HeaderValue::from_static(proto));

    // X-Forwarded-Host (original Host the client targeted)
    if let Some(original_host) = original.get("host") {
        headers.insert("x-forwarded-host", original_host.clone());
    }

    headers.insert("via", HeaderValue::from_static(VIA));

    if let Ok(val) = HeaderValue::from_str(correlation_id) {
        headers.insert(CORRELATION_HEADER, val);
    }

    headers
}
