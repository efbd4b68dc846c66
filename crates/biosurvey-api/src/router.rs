//! Axum router construction for the indicator API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::jobs;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// See [`handlers`] and [`jobs`] for the endpoint tables. `GET /ws/jobs`
/// streams job status changes.
///
/// CORS allows any origin; the authentication gateway in front of the
/// service is responsible for origin policy.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/indicators/health", get(handlers::indicators_health))
        // WebSocket
        .route("/ws/jobs", get(ws::ws_jobs))
        // Computed indicators
        .route("/api/projects/{id}/indicators/diversity", get(handlers::diversity))
        .route("/api/projects/{id}/indicators/species", get(handlers::species))
        .route("/api/projects/{id}/indicators/time-series", get(handlers::time_series))
        .route("/api/projects/{id}/indicators/aggregate", get(handlers::aggregate))
        .route("/api/projects/{id}/indicators/spatial", get(handlers::spatial))
        .route("/api/projects/{id}/indicators/spatial/geojson", get(handlers::spatial_geojson))
        .route("/api/projects/{id}/indicators/compare", get(handlers::compare))
        .route("/api/projects/{id}/indicators/summary", get(handlers::summary))
        // Stored indicators
        .route(
            "/api/projects/{id}/indicators",
            get(handlers::list_indicators).post(handlers::create_indicator),
        )
        .route("/api/projects/{id}/indicators/snapshot", post(handlers::snapshot))
        // Jobs
        .route("/api/projects/{id}/exports", post(jobs::submit_export))
        .route("/api/projects/{id}/reports", post(jobs::submit_report))
        .route("/api/jobs/cleanup", post(jobs::submit_cleanup))
        .route("/api/jobs/{job_id}", get(jobs::get_job))
        .route("/api/downloads/{kind}/{filename}", get(jobs::download))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
