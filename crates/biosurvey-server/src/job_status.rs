//! [`JobStatusStore`] backed by `Dragonfly`.
//!
//! Each status lives under `job:{id}:status` and expires after the
//! configured TTL, so finished jobs age out without a sweep.

use async_trait::async_trait;

use biosurvey_db::DragonflyPool;
use biosurvey_jobs::{JobError, JobStatus, JobStatusStore};
use biosurvey_types::JobId;

/// Job status kept in `Dragonfly` with a per-entry TTL.
pub struct DragonflyJobStatusStore {
    pool: DragonflyPool,
    ttl_secs: i64,
}

impl DragonflyJobStatusStore {
    /// Store statuses through `pool`, expiring each after `ttl_secs`.
    pub const fn new(pool: DragonflyPool, ttl_secs: i64) -> Self {
        Self { pool, ttl_secs }
    }
}

#[async_trait]
impl JobStatusStore for DragonflyJobStatusStore {
    async fn put(&self, status: &JobStatus) -> Result<(), JobError> {
        self.pool
            .set_job_status(status.job_id.into_inner(), status, self.ttl_secs)
            .await
            .map_err(JobError::status)
    }

    async fn get(&self, job_id: JobId) -> Result<Option<JobStatus>, JobError> {
        self.pool
            .get_job_status(job_id.into_inner())
            .await
            .map_err(JobError::status)
    }
}
