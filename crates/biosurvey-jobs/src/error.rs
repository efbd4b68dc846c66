//! Error types for background jobs.

use std::path::PathBuf;

use biosurvey_core::ServiceError;
use biosurvey_types::ProjectId;

/// Errors raised while submitting or running a job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The queue is at capacity; the caller should retry later.
    #[error("job queue is full")]
    QueueFull,

    /// The worker has stopped and no longer accepts jobs.
    #[error("job queue is closed")]
    QueueClosed,

    /// The job status store failed.
    #[error("job status store error: {message}")]
    Status {
        /// Description of the failure.
        message: String,
    },

    /// The project targeted by the job no longer exists.
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),

    /// Loading survey data failed.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Reading or writing an artifact failed.
    #[error("io error on {}: {source}", .path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// CSV encoding failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Report template rendering failed.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl JobError {
    /// Wrap a status store failure.
    pub fn status(err: impl core::fmt::Display) -> Self {
        Self::Status {
            message: err.to_string(),
        }
    }

    /// Wrap an I/O failure on `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<biosurvey_core::StoreError> for JobError {
    fn from(err: biosurvey_core::StoreError) -> Self {
        Self::Service(ServiceError::Store(err))
    }
}
