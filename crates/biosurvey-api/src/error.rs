//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies service, job, and request failures into one enum
//! that converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use biosurvey_core::{AccessError, ServiceError, ValidationFailure};
use biosurvey_jobs::JobError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No valid principal accompanied the request.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The principal may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// A path parameter could not be parsed.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The job queue is full.
    #[error("job queue is full, retry later")]
    Busy,

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Unauthenticated => Self::Unauthenticated(err.to_string()),
            AccessError::Inactive(_) | AccessError::NotAMember { .. } | AccessError::RoleNotPermitted { .. } => {
                Self::Forbidden(err.to_string())
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Access(e) => e.into(),
            ServiceError::Validation(v) => Self::Validation(v),
            ServiceError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            ServiceError::Store(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::QueueFull => Self::Busy,
            JobError::Service(e) => e.into(),
            JobError::ProjectNotFound(id) => Self::NotFound(format!("project {id}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(failure) => {
                let body = serde_json::json!({ "errors": failure.fields });
                return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
            }
            Self::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Busy => (StatusCode::SERVICE_UNAVAILABLE, String::from("job queue is full, retry later")),
            Self::Internal(msg) => {
                error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, String::from("internal server error"))
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
