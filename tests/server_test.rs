//! Server integration tests
//!
//! Tests for scrape handling, the landing page and health state.

mod common;

use common::*;
use lotus_exporter::collectors::CollectOptions;
use lotus_exporter::metrics::MetricsCollector;
use lotus_exporter::server::{landing_page, router, scrape, AppState};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Helper to create a scrape state backed by the in-memory doubles
fn create_test_state(fixture: Fixture) -> (AppState, Arc<Recorder>) {
    let connector = MockConnector::new(fixture);
    let recorder = connector.recorder.clone();
    let metrics = MetricsCollector::new().expect("Failed to create metrics");
    let state = AppState::new(metrics, Arc::new(connector), CollectOptions::default());
    (state, recorder)
}

#[tokio::test]
async fn test_scrape_returns_prometheus_text() {
    // Given: A healthy Lotus
    let (state, _) = create_test_state(Fixture::default());

    // When: Scraping
    let (status, body) = scrape(&state).await;

    // Then: 200 with samples and exporter health
    assert_eq!(status, 200);
    assert!(body.contains("# HELP"), "Missing HELP comment");
    assert!(body.contains("# TYPE"), "Missing TYPE comment");
    assert!(body.contains("lotus_up 1"));
    assert!(body.contains("lotus_chain_height{miner_id=\"f01234\"} 1000"));
    assert!(body.contains("lotus_scrape_duration_seconds"));
}

#[tokio::test]
async fn test_fatal_pass_returns_503_without_samples() {
    // Given: The provider identity cannot be read
    let fixture = Fixture {
        miner_id: None,
        ..Fixture::default()
    };
    let (state, _) = create_test_state(fixture);

    // When: Scraping
    let (status, body) = scrape(&state).await;

    // Then: 503 with the reason, and the registry holds no Lotus samples
    assert_eq!(status, 503);
    assert!(body.contains("Collection failed"));
    assert!(body.contains("ActorAddress"));
    assert_eq!(state.metrics.up.get(), 0.0);

    let rendered = state.metrics.render().unwrap();
    assert!(!rendered.contains("lotus_chain_height{"));
}

#[tokio::test]
async fn test_degraded_pass_still_returns_200() {
    let mut fixture = Fixture::default();
    fixture.failing.insert("MpoolPending");
    fixture.failing.insert("WorkerJobs");
    let (state, _) = create_test_state(fixture);

    let (status, body) = scrape(&state).await;

    assert_eq!(status, 200);
    assert!(body.contains("lotus_up 1"));
    assert!(body.contains("lotus_scrape_group_up{group=\"mpool\"} 0"));
    assert!(!body.contains("lotus_mpool_total{"));
}

#[tokio::test]
async fn test_every_scrape_runs_a_fresh_pass() {
    let (state, recorder) = create_test_state(Fixture::default());

    scrape(&state).await;
    scrape(&state).await;

    assert_eq!(recorder.daemon_opened.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.chain_head_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_scrapes_share_one_pass() {
    // Given: Session setup takes a while
    let fixture = Fixture {
        open_delay: Some(Duration::from_millis(100)),
        ..Fixture::default()
    };
    let (state, recorder) = create_test_state(fixture);

    // When: Three scrapes arrive together
    let (a, b, c) = tokio::join!(scrape(&state), scrape(&state), scrape(&state));

    // Then: One pass served all of them
    assert_eq!(recorder.daemon_opened.load(Ordering::SeqCst), 1);
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a.0, 200);
}

#[tokio::test]
async fn test_cancelled_scrape_does_not_wedge_later_scrapes() {
    // Given: A scrape abandoned while its pass is still opening sessions
    let fixture = Fixture {
        open_delay: Some(Duration::from_millis(200)),
        ..Fixture::default()
    };
    let (state, recorder) = create_test_state(fixture);
    let abandoned = tokio::time::timeout(Duration::from_millis(20), scrape(&state)).await;
    assert!(abandoned.is_err());

    // When: The next scrape arrives
    let (status, _) = scrape(&state).await;

    // Then: It runs its own pass and no sessions leak
    assert_eq!(status, 200);
    assert_eq!(recorder.daemon_opened.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.opened(), recorder.closed());
}

#[test]
fn test_landing_page_links_metrics_path() {
    let page = landing_page("/lotus-metrics");

    assert!(page.contains("Lotus Prometheus Exporter"));
    assert!(page.contains("href=\"/lotus-metrics\""));
    assert!(page.contains("href=\"/health\""));
}

#[test]
fn test_router_accepts_custom_metrics_path() {
    let (state, _) = create_test_state(Fixture::default());

    // Building the router must not panic on a non-default path
    let _app = router(state, "/custom/metrics");
}

#[test]
fn test_health_check_logic() {
    let metrics = MetricsCollector::new().expect("Failed to create metrics");

    // Before the first pass nothing has succeeded yet
    assert_eq!(metrics.up.get(), 0.0);

    // Simulate healthy state
    metrics.up.set(1.0);
    assert!(metrics.up.get() > 0.0, "Health check should pass when up > 0");

    // Simulate unhealthy state
    metrics.up.set(0.0);
    assert!(metrics.up.get() == 0.0, "Health check should fail when up == 0");
}
