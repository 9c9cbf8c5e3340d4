//! `fanout-balancer dummy`: a throwaway upstream for trying the balancer.
//!
//! Answers every request with `Hello, world from <addr><path>`. By default
//! it sleeps a random time below one second first and turns about a
//! quarter of replies into `500`s, so serial failover and concurrent
//! dispatch can be watched against a handful of local instances.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use rand::Rng;

use crate::cli::DummyArgs;
use crate::error::BalancerError;
use crate::logging::{self, LogTarget, Timestamps};
use crate::server;

/// Share of replies turned into errors when failures are enabled.
const ERROR_RATE: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Address echoed in replies.
    pub address: String,
    pub delay: bool,
    pub errors: bool,
}

pub fn router(config: DummyConfig) -> Router {
    Router::new().fallback(hello).with_state(Arc::new(config))
}

#[allow(clippy::cast_possible_truncation)]
async fn hello(State(config): State<Arc<DummyConfig>>, uri: Uri) -> Response {
    let (delay, fail) = {
        let mut rng = rand::thread_rng();
        let delay = if config.delay {
            Duration::from_micros(rng.gen_range(0..1_000_000))
        } else {
            Duration::ZERO
        };
        (delay, config.errors && rng.gen_bool(ERROR_RATE))
    };

    tracing::info!(uri = %uri, delay_ms = delay.as_millis() as u64, error = fail, "will serve");
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let status = if fail {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    let message = if delay.is_zero() {
        format!("Hello, world from {}{uri}\n", config.address)
    } else {
        format!("Hello, world from {}{uri} after {delay:?}\n", config.address)
    };

    (status, message).into_response()
}

pub async fn execute(args: DummyArgs) -> Result<(), BalancerError> {
    let log_target = LogTarget::Stdout;
    logging::init(
        &args.log_level,
        logging::resolve_format(false, false, &log_target),
        &log_target,
        Timestamps::default(),
    )?;

    let addr = server::parse_listen_address(&args.address)?;
    let app = router(DummyConfig {
        address: args.address.clone(),
        delay: !args.no_delay,
        errors: !args.no_errors,
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, stop_after_secs = args.stop_after, "dummy upstream started");

    let stop_after = args.stop_after;
    let shutdown = async move {
        if stop_after == 0 {
            server::shutdown_signal().await;
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs(stop_after)) => {
                tracing::info!(stop_after_secs = stop_after, "stopping dummy upstream");
            }
            () = server::shutdown_signal() => {}
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
