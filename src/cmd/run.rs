//! `fanout-balancer run`: start the balancer.
//!
//! Installs logging (with the `--log-prefix` span), resolves settings (fatal on any configuration
//! error), binds every endpoint to a reverse proxy, and serves until
//! SIGTERM / Ctrl+C.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::Settings;
use crate::error::BalancerError;
use crate::logging::{self, LogTarget};
use crate::proxy::fanout::FanoutEngine;
use crate::server::{self, AppState};
use crate::telemetry::TracingTelemetry;

#[allow(clippy::cast_possible_truncation)]
pub async fn execute(args: RunArgs) -> Result<(), BalancerError> {
    let log_target = LogTarget::parse(&args.log_file);
    let log_format = logging::resolve_format(args.pretty, args.json, &log_target);
    logging::init(&args.log_level, log_format, &log_target, args.timestamps())?;
    let span = logging::prefix_span(&args.log_prefix);

    let settings = Settings::resolve(&args.balancer)?;
    let addr = server::parse_listen_address(&args.address)?;

    let http_client = server::build_http_client();
    let endpoints = settings.build_endpoints(&http_client)?;
    let endpoint_count = endpoints.len();

    let telemetry = Arc::new(TracingTelemetry::new());
    let engine = FanoutEngine::new(
        settings.mode,
        endpoints,
        settings.classifier.clone(),
        telemetry.clone(),
    );

    let router = server::build_router(
        Arc::new(AppState {
            engine,
            span: span.clone(),
        }),
        args.max_body,
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    span.in_scope(|| {
        tracing::info!(
            addr = %addr,
            endpoints = endpoint_count,
            mode = %settings.mode,
            terminal_responses = %settings.classifier,
            timeout_ms = settings.timeout.as_millis() as u64,
            "fanout-balancer started"
        );
    });

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

    span.in_scope(|| {
        tracing::info!(
            served = telemetry.stats().served.load(Ordering::Relaxed),
            failed = telemetry.stats().failed.load(Ordering::Relaxed),
            "fanout-balancer stopped"
        );
    });
    Ok(())
}
