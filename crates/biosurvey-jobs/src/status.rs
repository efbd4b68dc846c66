//! Persistence of job status.
//!
//! Workers write every transition through a [`JobStatusStore`]; the API
//! reads it back for polling clients. The server plugs in a `Dragonfly`
//! implementation; [`InMemoryJobStatusStore`] serves tests and the
//! no-Dragonfly development mode.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use biosurvey_types::JobId;

use crate::error::JobError;
use crate::job::JobStatus;

/// Storage for the latest status of each job.
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    /// Replace the stored status of `status.job_id`.
    async fn put(&self, status: &JobStatus) -> Result<(), JobError>;

    /// Latest status of `job_id`, or `None` if unknown or expired.
    async fn get(&self, job_id: JobId) -> Result<Option<JobStatus>, JobError>;
}

/// In-memory [`JobStatusStore`].
///
/// With a TTL, finished jobs are forgotten once their last update is older
/// than the TTL; queued and running jobs are always kept.
#[derive(Debug, Default)]
pub struct InMemoryJobStatusStore {
    statuses: RwLock<HashMap<JobId, JobStatus>>,
    ttl: Option<TimeDelta>,
}

impl InMemoryJobStatusStore {
    /// Create an empty store whose entries never expire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that forgets finished jobs `ttl_secs` after
    /// their last update.
    pub fn with_ttl(ttl_secs: i64) -> Self {
        Self {
            statuses: RwLock::default(),
            ttl: TimeDelta::try_seconds(ttl_secs.max(0)),
        }
    }

    fn expired(&self, status: &JobStatus, now: DateTime<Utc>) -> bool {
        self.ttl.is_some_and(|ttl| {
            status.state.is_terminal() && now.signed_duration_since(status.updated_at) > ttl
        })
    }
}

#[async_trait]
impl JobStatusStore for InMemoryJobStatusStore {
    async fn put(&self, status: &JobStatus) -> Result<(), JobError> {
        let now = Utc::now();
        let mut statuses = self.statuses.write().await;
        if self.ttl.is_some() {
            statuses.retain(|_, s| !self.expired(s, now));
        }
        statuses.insert(status.job_id, status.clone());
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Option<JobStatus>, JobError> {
        let now = Utc::now();
        Ok(self
            .statuses
            .read()
            .await
            .get(&job_id)
            .filter(|s| !self.expired(s, now))
            .cloned())
    }
}
