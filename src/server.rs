//! HTTP Server and Scrape Handling
//!
//! This module implements the Prometheus exporter HTTP server.
//!
//! # Architecture
//!
//! - **HTTP Server**: Axum-based server exposing the metrics path, `/health`, and `/`
//! - **Scrape-triggered collection**: every metrics request runs one collection pass
//!   against Lotus; there is no background loop
//! - **Single flight**: concurrent scrapes share the pass already in progress, so at
//!   most one set of Lotus sessions is open at any time
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page linking the metrics path
//! - `GET <metrics path>` - runs a pass, returns Prometheus text (503 if the pass failed)
//! - `GET /health` - 200 if the last pass succeeded, 503 otherwise
//!
//! # Error Handling
//!
//! Best-effort groups that fail only drop their own samples; the scrape still
//! returns 200. A failure that aborts the pass (provider identity, chain head,
//! load-bearing parse errors, unreachable endpoints) returns 503 with no Lotus
//! samples and sets `lotus_up` to 0.

use crate::collectors::{self, CollectOptions};
use crate::config::Config;
use crate::error::ExporterError;
use crate::flight::SingleFlight;
use crate::lotus::{Connector, LotusConnector};
use crate::metrics::MetricsCollector;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

const HEALTH_PATH: &str = "/health";

/// Body or failure shared by every caller joined onto one pass
type ScrapeOutcome = std::result::Result<Arc<String>, (StatusCode, Arc<String>)>;

#[derive(Clone)]
pub struct AppState {
    pub metrics: MetricsCollector,
    connector: Arc<dyn Connector>,
    options: CollectOptions,
    flight: Arc<SingleFlight<ScrapeOutcome>>,
}

impl AppState {
    pub fn new(
        metrics: MetricsCollector,
        connector: Arc<dyn Connector>,
        options: CollectOptions,
    ) -> Self {
        Self {
            metrics,
            connector,
            options,
            flight: Arc::new(SingleFlight::new()),
        }
    }
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let metrics_path = config.server.metrics_path.clone();
    validate_metrics_path(&metrics_path)?;

    let connector = LotusConnector::from_config(&config.lotus)?;
    info!("Lotus daemon API: {}", connector.daemon_url());
    info!("Lotus miner API: {}", connector.miner_url());

    let state = AppState::new(
        MetricsCollector::new()?,
        Arc::new(connector),
        CollectOptions::from_config(&config.lotus),
    );

    let app = router(state, &metrics_path);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::Server(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    info!("Metrics available at http://{}{}", addr, metrics_path);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the exporter router with the metrics handler mounted at `metrics_path`.
pub fn router(state: AppState, metrics_path: &str) -> Router {
    let landing = landing_page(metrics_path);

    Router::new()
        .route("/", get(move || async move { Html(landing) }))
        .route(metrics_path, get(metrics_handler))
        .route(HEALTH_PATH, get(health_handler))
        .with_state(state)
}

fn validate_metrics_path(path: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        path.starts_with('/'),
        "Metrics path must start with '/', got {:?}",
        path
    );
    anyhow::ensure!(
        path != "/" && path != HEALTH_PATH,
        "Metrics path {:?} collides with a built-in endpoint",
        path
    );
    Ok(())
}

pub fn landing_page(metrics_path: &str) -> String {
    format!(
        r#"<html>
<head><title>Lotus Exporter</title></head>
<body>
<h1>Lotus Prometheus Exporter</h1>
<p><a href="{metrics_path}">Metrics</a></p>
<p><a href="{HEALTH_PATH}">Health</a></p>
</body>
</html>"#
    )
}

/// Run a collection pass (or join the one in flight) and return its rendering.
pub async fn scrape(state: &AppState) -> (StatusCode, String) {
    match state.flight.run(|| collect_and_render(state)).await {
        Ok(body) => (StatusCode::OK, body.as_ref().clone()),
        Err((status, message)) => (status, message.as_ref().clone()),
    }
}

async fn collect_and_render(state: &AppState) -> ScrapeOutcome {
    let started = Instant::now();
    let result = collectors::run_pass(state.connector.as_ref(), &state.options).await;
    state
        .metrics
        .scrape_duration_seconds
        .set(started.elapsed().as_secs_f64());

    match result {
        Ok(snapshot) => {
            state.metrics.record(&snapshot);
            state.metrics.up.set(1.0);
        }
        Err(e) => {
            error!("Collection pass failed: {}", e);
            state.metrics.reset();
            state.metrics.up.set(0.0);
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Arc::new(format!("Collection failed: {}", e)),
            ));
        }
    }

    match state.metrics.render() {
        Ok(body) => Ok(Arc::new(body)),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Arc::new(format!("Error rendering metrics: {}", e)),
            ))
        }
    }
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    scrape(&state).await.into_response()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let up_value = state.metrics.up.get();

    if up_value > 0.0 {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Lotus API unreachable")
    }
}
