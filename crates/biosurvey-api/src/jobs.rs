//! Job submission, job status, and artifact download handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/projects/{id}/exports` | Queue an observation export (202) |
//! | `POST` | `/api/projects/{id}/reports` | Queue a project report (202) |
//! | `POST` | `/api/jobs/cleanup` | Queue artifact cleanup, admins only (202) |
//! | `GET` | `/api/jobs/{job_id}` | Latest job status |
//! | `GET` | `/api/downloads/{kind}/{filename}` | Download an export or report |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;
use tracing::info;

use biosurvey_core::Principal;
use biosurvey_core::access::require_role;
use biosurvey_core::validation::ExportBody;
use biosurvey_jobs::{ArtifactKind, JobKind, JobStatus};
use biosurvey_types::{JobId, Role};

use crate::auth::Caller;
use crate::error::ApiError;
use crate::handlers::parse_project_id;
use crate::state::AppState;

fn accepted(message: &str, status: &JobStatus) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "message": message,
            "job_id": status.job_id,
            "job": status,
        })),
    )
}

/// `POST /api/projects/{id}/exports`
pub async fn submit_export(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
    Json(body): Json<ExportBody>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    state.service.authorize_project(&principal, project_id).await?;
    let request = body.validate()?;
    let status = state
        .jobs
        .submit(JobKind::ExportObservations { project_id, request }, Some(principal.user_id))
        .await?;
    info!(job_id = %status.job_id, project_id = %project_id, format = %request.format, "export requested");
    Ok(accepted("Export started", &status))
}

/// `POST /api/projects/{id}/reports`
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let project_id = parse_project_id(&id_str)?;
    state.service.authorize_project(&principal, project_id).await?;
    let status = state
        .jobs
        .submit(JobKind::ProjectReport { project_id }, Some(principal.user_id))
        .await?;
    info!(job_id = %status.job_id, project_id = %project_id, "report requested");
    Ok(accepted("Report generation started", &status))
}

/// `POST /api/jobs/cleanup`
pub async fn submit_cleanup(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
) -> Result<impl IntoResponse, ApiError> {
    require_role(&principal, &[Role::Admin], "run cleanup")?;
    let status = state.jobs.submit(JobKind::Cleanup, Some(principal.user_id)).await?;
    Ok(accepted("Cleanup started", &status))
}

/// `GET /api/jobs/{job_id}`
///
/// Jobs the caller may not see are reported as not found.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path(id_str): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    let job_id = id_str
        .parse::<JobId>()
        .map_err(|e| ApiError::BadRequest(format!("invalid job id {id_str}: {e}")))?;
    let not_found = || ApiError::NotFound(format!("job {job_id}"));
    let status = state.jobs.status(job_id).await?.ok_or_else(not_found)?;
    if !can_view(&state, &principal, &status).await {
        return Err(not_found());
    }
    Ok(Json(status))
}

/// Whether `principal` may see `status`: admins see everything, users see
/// their own jobs and jobs of projects they can access.
pub(crate) async fn can_view(state: &AppState, principal: &Principal, status: &JobStatus) -> bool {
    if principal.is_admin() || status.submitted_by == Some(principal.user_id) {
        return true;
    }
    match status.project_id {
        Some(project_id) => state.service.authorize_project(principal, project_id).await.is_ok(),
        None => false,
    }
}

/// `GET /api/downloads/{kind}/{filename}`
pub async fn download(
    State(state): State<Arc<AppState>>,
    Caller(principal): Caller,
    Path((kind_str, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let not_found = || ApiError::NotFound(format!("{kind_str}/{filename}"));
    let kind = ArtifactKind::from_dir_name(&kind_str).ok_or_else(not_found)?;
    let path = kind
        .resolve(state.jobs_config(), &filename)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid file name {filename}")))?;

    match kind.project_of(&filename) {
        Some(project_id) => {
            state.service.authorize_project(&principal, project_id).await?;
        }
        None => require_role(&principal, &[Role::Admin], "download unscoped artifacts")?,
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(ApiError::Internal(format!("reading {}: {e}", path.display()))),
    };

    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv; charset=utf-8",
        Some("json") => "application/json",
        Some("html") => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    };
    let disposition = format!("attachment; filename=\"{filename}\"");
    Ok((
        [(header::CONTENT_TYPE, content_type.to_owned()), (header::CONTENT_DISPOSITION, disposition)],
        bytes,
    ))
}
