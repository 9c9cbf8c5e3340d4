//! End-to-end tests: real upstreams, the Axum router, and graceful shutdown.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{closed_port, serve, start_balancer, truncated_upstream, upstream};
use fanout_balancer::cmd::dummy::{self, DummyConfig};
use fanout_balancer::proxy::fanout::DispatchMode;

const TERMINAL: &str = "100,200,300,400";

#[tokio::test]
async fn serial_fails_over_to_first_accepted() {
    let endpoints = vec![
        upstream(500, "first", 0).await,
        upstream(503, "second", 0).await,
        upstream(200, "third", 0).await,
    ];
    let balancer = start_balancer(&endpoints, DispatchMode::Serial, TERMINAL, 2000).await;

    let resp = reqwest::get(balancer.url("/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "third");
    assert_eq!(balancer.telemetry.stats().served.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn concurrent_prefers_lowest_index() {
    let endpoints = vec![
        upstream(200, "slow-zero", 200).await,
        upstream(500, "broken", 0).await,
        upstream(200, "fast-two", 0).await,
    ];
    let balancer = start_balancer(&endpoints, DispatchMode::Concurrent, TERMINAL, 2000).await;

    let resp = reqwest::get(balancer.url("/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "slow-zero");
}

#[tokio::test]
async fn nothing_accepted_returns_bare_500() {
    for mode in [DispatchMode::Serial, DispatchMode::Concurrent] {
        let endpoints = vec![upstream(500, "a", 0).await, upstream(500, "b", 0).await];
        let balancer = start_balancer(&endpoints, mode, TERMINAL, 2000).await;

        let resp = reqwest::Client::new()
            .get(balancer.url("/"))
            .header("x-correlation-id", "trace-me")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 500);
        assert_eq!(resp.headers()["x-correlation-id"], "trace-me");
        assert!(resp.text().await.unwrap().is_empty());
        assert_eq!(balancer.telemetry.stats().failed.load(Ordering::Relaxed), 1);
    }
}

#[tokio::test]
async fn accepted_non_ok_status_is_relayed_without_body() {
    let endpoints = vec![upstream(404, "missing page", 0).await];
    let balancer = start_balancer(&endpoints, DispatchMode::Serial, TERMINAL, 2000).await;

    let resp = reqwest::get(balancer.url("/missing")).await.unwrap();
    assert_eq!(resp.status(), 404);
    assert!(resp.text().await.unwrap().is_empty());
}

#[tokio::test]
async fn status_outside_terminal_set_is_skipped() {
    let endpoints = vec![upstream(404, "nope", 0).await, upstream(200, "yes", 0).await];
    let balancer = start_balancer(&endpoints, DispatchMode::Serial, "200", 2000).await;

    let resp = reqwest::get(balancer.url("/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "yes");
}

#[tokio::test]
async fn unreachable_endpoint_loses_selection() {
    let endpoints = vec![closed_port().await, upstream(200, "alive", 0).await];
    let balancer = start_balancer(&endpoints, DispatchMode::Serial, TERMINAL, 2000).await;

    let resp = reqwest::get(balancer.url("/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "alive");
}

#[tokio::test]
async fn slow_endpoint_times_out_and_loses() {
    let endpoints = vec![upstream(200, "too late", 1000).await, upstream(200, "on time", 0).await];
    let balancer = start_balancer(&endpoints, DispatchMode::Concurrent, TERMINAL, 100).await;

    let resp = reqwest::get(balancer.url("/")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "on time");
}

#[tokio::test]
async fn truncated_reply_loses_to_complete_one() {
    for close in [true, false] {
        let endpoints = vec![
            truncated_upstream(close).await,
            upstream(200, "complete", 0).await,
        ];
        let balancer = start_balancer(&endpoints, DispatchMode::Concurrent, TERMINAL, 300).await;

        let resp = reqwest::get(balancer.url("/")).await.unwrap();
        assert_eq!(resp.status(), 200, "close={close}");
        assert_eq!(resp.text().await.unwrap(), "complete", "close={close}");
    }
}

#[tokio::test]
async fn head_request_relays_upstream_length() {
    let endpoints = vec![upstream(200, "hello!", 0).await];
    let balancer = start_balancer(&endpoints, DispatchMode::Serial, TERMINAL, 2000).await;

    let resp = reqwest::Client::new()
        .head(balancer.url("/"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-length"], "6");
}

#[tokio::test]
async fn correlation_id_is_generated_when_missing() {
    let endpoints = vec![upstream(200, "ok", 0).await];
    let balancer = start_balancer(&endpoints, DispatchMode::Serial, TERMINAL, 2000).await;

    let resp = reqwest::get(balancer.url("/")).await.unwrap();
    let id = resp.headers()["x-correlation-id"].to_str().unwrap();
    assert_eq!(id.len(), 36);
}

#[tokio::test]
async fn dummy_upstream_answers_through_balancer() {
    let addr = serve(dummy::router(DummyConfig {
        address: "dummy".into(),
        delay: false,
        errors: false,
    }))
    .await;
    let endpoints = vec![format!("http://{addr}")];
    let balancer = start_balancer(&endpoints, DispatchMode::Serial, TERMINAL, 2000).await;

    let resp = reqwest::get(balancer.url("/greeting?lang=en")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.text().await.unwrap(),
        "Hello, world from dummy/greeting?lang=en\n"
    );
}

#[tokio::test]
async fn graceful_shutdown_works() {
    let endpoints = vec![upstream(200, "ok", 0).await];
    let balancer = start_balancer(&endpoints, DispatchMode::Serial, TERMINAL, 2000).await;
    let url = balancer.url("/");

    assert!(reqwest::get(&url).await.is_ok());

    drop(balancer);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(reqwest::get(&url).await.is_err());
}
