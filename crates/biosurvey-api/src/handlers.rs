//! REST handlers for status pages and indicator endpoints.
//!
//! Every project endpoint resolves the [`Caller`] first and hands the
//! principal to the [`IndicatorService`](biosurvey_core::IndicatorService),
//! which runs the capability check before loading any data.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/health` | Liveness plus store reachability |
//! | `GET` | `/api/indicators/health` | Indicator API liveness |
//! | `GET` | `/api/projects/{id}/indicators/diversity` | Diversity indices |
//! | `GET` | `/api/projects/{id}/indicators/species` | Per-species abundance |
//! | `GET` | `/api/projects/{id}/indicators/time-series` | Date/value columns |
//! | `GET` | `/api/projects/{id}/indicators/aggregate` | Bucket key/value points |
//! | `GET` | `/api/projects/{id}/indicators/spatial` | Density grid cells |
//! | `GET` | `/api/projects/{id}/indicators/spatial/geojson` | Density grid as `GeoJSON` |
//! | `GET` | `/api/projects/{id}/indicators/compare` | Year-over-year comparison |
//! | `GET` | `/api/projects/{id}/indicators/summary` | Project statistics |
//! | `GET` | `/api/projects/{id}/indicators` | Stored indicators |
//! | `POST` | `/api/projects/{id}/indicators` | Store an indicator |
//! | `POST` | `/api/projects/{id}/indicators/snapshot` | Store current diversity |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use chrono::{Datelike, Utc};
use serde_json::{Value, json};

use biosurvey_core::validation::{CreateIndicatorBody, IndicatorParams};
use biosurvey_indicators::grid_to_geojson;
use biosurvey_types::ProjectId;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_status = match state.service.store().ping().await {
        Ok(()) => "OK",
        Err(_) => "UNREACHABLE",
    };
    let uptime_secs = Utc::now().signed_duration_since(state.started_at).num_seconds();
    let output_dir = state.jobs_config().output_dir.display().to_string();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Biosurvey Indicators</title>
    <style>
        body {{
            background: #f4f7f2;
            color: #1b2a1b;
            font-family: 'Segoe UI', 'Helvetica Neue', sans-serif;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #2e6b30; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #5b6f5b; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #ffffff;
            border: 1px solid #c9d8c9;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #5b6f5b; font-size: 0.85rem; }}
        .metric .value {{ color: #2e6b30; font-size: 1.5rem; font-weight: bold; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; font-family: monospace; }}
    </style>
</head>
<body>
    <h1>Biosurvey Indicators</h1>
    <p class="subtitle">Biodiversity indicator and reporting service</p>

    <div>
        <div class="metric">
            <div class="label">Store</div>
            <div class="value">{store_status}</div>
        </div>
        <div class="metric">
            <div class="label">Uptime (s)</div>
            <div class="value">{uptime_secs}</div>
        </div>
    </div>

    <p>Artifacts: <code>{output_dir}</code></p>

    <h2>Endpoints</h2>
    <ul>
        <li>GET /api/projects/{{id}}/indicators/diversity</li>
        <li>GET /api/projects/{{id}}/indicators/species</li>
        <li>GET /api/projects/{{id}}/indicators/time-series</li>
        <li>GET /api/projects/{{id}}/indicators/aggregate</li>
        <li>GET /api/projects/{{id}}/indicators/spatial</li>
        <li>GET /api/projects/{{id}}/indicators/compare</li>
        <li>GET /api/projects/{{id}}/indicators/summary</li>
        <li>POST /api/projects/{{id}}/exports</li>
        <li>POST /api/projects/{{id}}/reports</li>
        <li>GET /api/jobs/{{job_id}}</li>
        <li>GET /ws/jobs</li>
    </ul>
</body>
</html>"#
    ))
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.service.store().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "message": "Biosurvey indicator API is running",
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "message": "survey store unreachable",
                })),
            )
        }
    }
}

/// `GET /api/indicators/health`
pub async fn indicators_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Computed indicators
// ---------------------------------------------------------------------------

/// `GET /api/projects/{id}/indicators/diversity`
pub async fn diversity(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Query(params): Query<IndicatorParams>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let filter = params.filter()?;
    let indices = state.service.diversity(&principal, project_id, &filter).await?;
    Ok(Json(json!({
        "project_id": project_id,
        "diversity": indices,
    })))
}

/// `GET /api/projects/{id}/indicators/species`
pub async fn species(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Query(params): Query<IndicatorParams>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let filter = params.filter()?;
    let species = state.service.species_abundance(&principal, project_id, &filter).await?;
    Ok(Json(json!({
        "count": species.len(),
        "species": species,
    })))
}

/// `GET /api/projects/{id}/indicators/time-series`
pub async fn time_series(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Query(params): Query<IndicatorParams>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let request = params.time_series(state.service.defaults())?;
    let series = state.service.time_series(&principal, project_id, &request).await?;
    Ok(Json(json!(series)))
}

/// `GET /api/projects/{id}/indicators/aggregate`
pub async fn aggregate(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Query(params): Query<IndicatorParams>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let request = params.time_series(state.service.defaults())?;
    let points = state.service.aggregate(&principal, project_id, &request).await?;
    Ok(Json(json!({
        "interval": request.interval,
        "metric": request.metric,
        "points": points,
    })))
}

/// `GET /api/projects/{id}/indicators/spatial`
pub async fn spatial(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Query(params): Query<IndicatorParams>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let request = params.spatial(state.service.defaults())?;
    let grid = state.service.spatial(&principal, project_id, &request).await?;
    Ok(Json(json!({
        "grid_size": grid.grid_size,
        "count": grid.cells.len(),
        "cells": grid.cells,
    })))
}

/// `GET /api/projects/{id}/indicators/spatial/geojson`
pub async fn spatial_geojson(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Query(params): Query<IndicatorParams>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let request = params.spatial(state.service.defaults())?;
    let grid = state.service.spatial(&principal, project_id, &request).await?;
    Ok(Json(grid_to_geojson(&grid.cells, grid.grid_size)))
}

/// `GET /api/projects/{id}/indicators/compare`
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Query(params): Query<IndicatorParams>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let request = params.comparison(Utc::now().year())?;
    let comparison = state.service.compare(&principal, project_id, &request).await?;
    Ok(Json(json!(comparison)))
}

/// `GET /api/projects/{id}/indicators/summary`
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let summary = state.service.summary(&principal, project_id).await?;
    Ok(Json(json!(summary)))
}

// ---------------------------------------------------------------------------
// Stored indicators
// ---------------------------------------------------------------------------

/// `GET /api/projects/{id}/indicators`
pub async fn list_indicators(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let indicators = state.service.list_indicators(&principal, project_id).await?;
    Ok(Json(json!({
        "count": indicators.len(),
        "indicators": indicators,
    })))
}

/// `POST /api/projects/{id}/indicators`
pub async fn create_indicator(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Json(body): Json<CreateIndicatorBody>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let now = Utc::now();
    let new = body.validate_at(now)?;
    let indicator = state.service.create_indicator(&principal, project_id, new, now).await?;
    Ok((StatusCode::CREATED, Json(json!(indicator))))
}

/// `POST /api/projects/{id}/indicators/snapshot`
pub async fn snapshot(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    let indicators = state.service.snapshot(&principal, project_id, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "count": indicators.len(),
            "indicators": indicators,
        })),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a project id path segment.
pub(crate) fn parse_project_id(s: &str) -> Result<ProjectId, ApiError> {
    s.parse::<ProjectId>()
        .map_err(|e| ApiError::BadRequest(format!("invalid project id {s}: {e}")))
}
