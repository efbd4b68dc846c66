//! Integration tests for the indicator API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The survey and job status stores are in memory;
//! job artifacts go to a temporary directory.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use biosurvey_api::auth::USER_HEADER;
use biosurvey_api::{AppState, build_router};
use biosurvey_core::config::{IndicatorsConfig, JobsConfig};
use biosurvey_core::{IndicatorService, InMemoryStore};
use biosurvey_jobs::{InMemoryJobStatusStore, JobContext, JobQueue};
use biosurvey_types::{
    ConservationStatus, Observation, ObservationId, Project, ProjectId, ProjectStatus, Role, Species, SpeciesId,
    User, UserId,
};

struct Fixture {
    router: Router,
    project: ProjectId,
    admin: UserId,
    member: UserId,
    outsider: UserId,
    inactive: UserId,
    _output: TempDir,
}

fn user(role: Role, active: bool, first: &str) -> User {
    User {
        id: UserId::new(),
        username: first.to_lowercase(),
        email: format!("{}@example.org", first.to_lowercase()),
        first_name: first.to_owned(),
        last_name: "Tester".to_owned(),
        role,
        is_active: active,
        created_at: Utc::now(),
    }
}

async fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let admin = user(Role::Admin, true, "Amina");
    let member = user(Role::Observer, true, "Baraka");
    let outsider = user(Role::Researcher, true, "Chege");
    let inactive = user(Role::Observer, false, "Dalia");
    for u in [&admin, &member, &outsider, &inactive] {
        store.put_user(u.clone()).await;
    }

    let project = Project {
        id: ProjectId::new(),
        name: "Mara transects".to_owned(),
        description: None,
        location: Some("Maasai Mara".to_owned()),
        start_date: None,
        end_date: None,
        status: ProjectStatus::Active,
        created_by: admin.id,
        members: BTreeSet::from([member.id, inactive.id]),
        created_at: Utc::now(),
    };
    store.put_project(project.clone()).await;

    let names = ["Loxodonta africana", "Giraffa camelopardalis", "Panthera leo"];
    for (name, count) in names.into_iter().zip([5u32, 3, 2]) {
        let species = Species {
            id: SpeciesId::new(),
            scientific_name: name.to_owned(),
            common_name: name.to_owned(),
            family: None,
            genus: None,
            species_code: None,
            conservation_status: Some(ConservationStatus::Vulnerable),
        };
        store.put_species(species.clone()).await;
        let observed_at = Utc.with_ymd_and_hms(2024, 8, 14, 6, 30, 0).unwrap();
        store
            .put_observation(Observation {
                id: ObservationId::new(),
                project_id: project.id,
                species_id: species.id,
                observer_id: member.id,
                observed_at,
                latitude: -1.4061,
                longitude: 35.0081,
                location_name: Some("Musiara".to_owned()),
                count,
                behavior: None,
                habitat_description: None,
                weather_conditions: None,
                notes: None,
                accuracy: None,
                altitude: None,
                created_at: observed_at,
            })
            .await;
    }

    let output = tempfile::tempdir().unwrap();
    let service = IndicatorService::new(store, IndicatorsConfig::default());
    let jobs_config = JobsConfig {
        output_dir: output.path().to_path_buf(),
        ..JobsConfig::default()
    };
    let ctx = JobContext::new(service.clone(), Arc::new(InMemoryJobStatusStore::new()), jobs_config);
    let (queue, _worker) = JobQueue::start(ctx);
    let router = build_router(Arc::new(AppState::new(service, queue)));

    Fixture {
        router,
        project: project.id,
        admin: admin.id,
        member: member.id,
        outsider: outsider.id,
        inactive: inactive.id,
        _output: output,
    }
}

fn get(uri: &str, user: Option<UserId>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(id) = user {
        builder = builder.header(USER_HEADER, id.to_string());
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user: UserId, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(USER_HEADER, user.to_string())
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

// =========================================================================
// Status
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let fx = fixture().await;
    let response = fx.router.clone().oneshot(get("/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_health_endpoints() {
    let fx = fixture().await;
    let (status, json) = send(&fx.router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");

    let (status, json) = send(&fx.router, get("/api/indicators/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

// =========================================================================
// Access control
// =========================================================================

#[tokio::test]
async fn test_missing_or_unknown_principal_is_unauthorized() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/diversity", fx.project);

    let (status, json) = send(&fx.router, get(&uri, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["status"], 401);

    let (status, _) = send(&fx.router, get(&uri, Some(UserId::new()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::get(&uri).header(USER_HEADER, "not-a-uuid").body(Body::empty()).unwrap();
    let (status, _) = send(&fx.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_and_outsider_are_forbidden() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/diversity", fx.project);

    let (status, _) = send(&fx.router, get(&uri, Some(fx.inactive))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&fx.router, get(&uri, Some(fx.outsider))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["status"], 403);
}

#[tokio::test]
async fn test_unknown_and_malformed_project() {
    let fx = fixture().await;
    let (status, _) = send(
        &fx.router,
        get(&format!("/api/projects/{}/indicators/diversity", ProjectId::new()), Some(fx.admin)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&fx.router, get("/api/projects/mara/indicators/diversity", Some(fx.admin))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =========================================================================
// Computed indicators
// =========================================================================

#[tokio::test]
async fn test_diversity_for_member() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/diversity", fx.project);
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;

    assert_eq!(status, StatusCode::OK);
    let d = &json["diversity"];
    assert_eq!(d["species_richness"], 3);
    assert_eq!(d["total_individuals"], 10);
    assert!((d["simpson_index"].as_f64().unwrap() - 0.62).abs() < 1e-9);
    assert!((d["shannon_index"].as_f64().unwrap() - 1.029_653).abs() < 1e-5);
}

#[tokio::test]
async fn test_diversity_respects_date_filter() {
    let fx = fixture().await;
    let uri = format!(
        "/api/projects/{}/indicators/diversity?start_date=2025-01-01",
        fx.project
    );
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["diversity"]["species_richness"], 0);
}

#[tokio::test]
async fn test_invalid_date_range_is_rejected_with_field_errors() {
    let fx = fixture().await;
    let uri = format!(
        "/api/projects/{}/indicators/diversity?start_date=2024-09-01&end_date=2024-08-01",
        fx.project
    );
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["errors"]["end_date"].is_array());
}

#[tokio::test]
async fn test_species_listing_sorted_by_abundance() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/species", fx.project);
    let (status, json) = send(&fx.router, get(&uri, Some(fx.admin))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 3);
    assert_eq!(json["species"][0]["abundance"], 5);
    assert_eq!(json["species"][2]["abundance"], 2);
}

#[tokio::test]
async fn test_time_series_defaults_to_monthly_count() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/time-series?interval=hourly", fx.project);
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["dates"][0], "2024-08");
    assert_eq!(json["values"][0], 3);
    assert_eq!(json["dates"].as_array().unwrap().len(), json["values"].as_array().unwrap().len());
}

#[tokio::test]
async fn test_aggregate_abundance_daily() {
    let fx = fixture().await;
    let uri = format!(
        "/api/projects/{}/indicators/aggregate?interval=daily&metric=abundance",
        fx.project
    );
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["points"][0]["bucket_key"], "2024-08-14");
    assert_eq!(json["points"][0]["value"], 10);
}

#[tokio::test]
async fn test_spatial_grid_and_geojson() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/spatial?grid_size=0.5", fx.project);
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["cells"][0]["density"], 3);

    let uri = format!("/api/projects/{}/indicators/spatial/geojson?grid_size=0.5", fx.project);
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["features"][0]["properties"]["density"], 3);
}

#[tokio::test]
async fn test_spatial_rejects_non_positive_grid() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/spatial?grid_size=0", fx.project);
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["errors"]["grid_size"].is_array());
}

#[tokio::test]
async fn test_compare_periods() {
    let fx = fixture().await;
    let uri = format!(
        "/api/projects/{}/indicators/compare?compare_period=2023&current_period=2024",
        fx.project
    );
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["baseline"]["year"], 2023);
    assert_eq!(json["current"]["indices"]["species_richness"], 3);
    assert_eq!(json["change"]["species_richness"], 3);
}

#[tokio::test]
async fn test_summary() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/summary", fx.project);
    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_observations"], 3);
    assert_eq!(json["unique_observers"], 1);
    assert_eq!(json["first_observation"], "2024-08-14");
}

// =========================================================================
// Stored indicators
// =========================================================================

#[tokio::test]
async fn test_create_indicator_requires_researcher_or_admin() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators", fx.project);
    let body = serde_json::json!({
        "name": "Elephant density",
        "metric_type": "density",
        "value": 0.42,
        "unit": "ind/km2",
    });

    let (status, _) = send(&fx.router, post_json(&uri, fx.member, &body)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&fx.router, post_json(&uri, fx.admin, &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "Elephant density");

    let (status, json) = send(&fx.router, get(&uri, Some(fx.member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
}

#[tokio::test]
async fn test_create_indicator_validation() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators", fx.project);
    let body = serde_json::json!({
        "name": "",
        "metric_type": "biomass",
        "unit": "a unit label that is far too long",
    });
    let (status, json) = send(&fx.router, post_json(&uri, fx.admin, &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["name", "metric_type", "unit"] {
        assert!(json["errors"][field].is_array(), "{field}: {json}");
    }
}

#[tokio::test]
async fn test_snapshot_stores_diversity_rows() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/indicators/snapshot", fx.project);
    let (status, json) = send(&fx.router, post_json(&uri, fx.admin, &serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["count"], 4);
    assert_eq!(json["indicators"][0]["name"], "Species richness");
    assert_eq!(json["indicators"][0]["value"], 3.0);
}

// =========================================================================
// Jobs
// =========================================================================

async fn wait_for_job(router: &Router, job_id: &str, user: UserId) -> Value {
    for _ in 0..200 {
        let (status, json) = send(router, get(&format!("/api/jobs/{job_id}"), Some(user))).await;
        assert_eq!(status, StatusCode::OK);
        if json["state"] == "completed" || json["state"] == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish");
}

#[tokio::test]
async fn test_export_job_and_download() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/exports", fx.project);
    let (status, json) = send(&fx.router, post_json(&uri, fx.member, &serde_json::json!({ "format": "csv" }))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = json["job_id"].as_str().unwrap().to_owned();

    let done = wait_for_job(&fx.router, &job_id, fx.member).await;
    assert_eq!(done["state"], "completed", "{done}");
    assert_eq!(done["progress"], 100);
    let url = done["artifact"]["download_url"].as_str().unwrap().to_owned();

    let response = fx.router.clone().oneshot(get(&url, Some(fx.member))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/csv"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("ID,Species Scientific Name"));
    assert!(text.contains("Baraka Tester"));
    assert_eq!(text.lines().count(), 4);

    let (status, _) = send(&fx.router, get(&url, Some(fx.outsider))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Outsiders cannot see the job either.
    let (status, _) = send(&fx.router, get(&format!("/api/jobs/{job_id}"), Some(fx.outsider))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_rejects_unknown_format() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/exports", fx.project);
    let (status, json) = send(&fx.router, post_json(&uri, fx.member, &serde_json::json!({ "format": "pdf" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["errors"]["format"].is_array());
}

#[tokio::test]
async fn test_report_job_completes() {
    let fx = fixture().await;
    let uri = format!("/api/projects/{}/reports", fx.project);
    let (status, json) = send(&fx.router, post_json(&uri, fx.admin, &serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let done = wait_for_job(&fx.router, json["job_id"].as_str().unwrap(), fx.admin).await;
    assert_eq!(done["state"], "completed", "{done}");
    assert!(
        done["artifact"]["download_url"]
            .as_str()
            .unwrap()
            .starts_with("/api/downloads/reports/report_")
    );
}

#[tokio::test]
async fn test_cleanup_is_admin_only() {
    let fx = fixture().await;
    let (status, _) = send(&fx.router, post_json("/api/jobs/cleanup", fx.member, &serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = send(&fx.router, post_json("/api/jobs/cleanup", fx.admin, &serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["job"]["kind"], "cleanup");
}

#[tokio::test]
async fn test_download_rejects_traversal_and_unknown_kind() {
    let fx = fixture().await;
    let (status, _) = send(&fx.router, get("/api/downloads/exports/..%2Fsecret.csv", Some(fx.admin))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&fx.router, get("/api/downloads/uploads/a.csv", Some(fx.admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let missing = format!("/api/downloads/exports/observations_{}_20240101_000000_abcd.csv", fx.project);
    let (status, _) = send(&fx.router, get(&missing, Some(fx.admin))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
