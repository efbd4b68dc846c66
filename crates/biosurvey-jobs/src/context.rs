//! Everything a job needs, passed explicitly.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::warn;

use biosurvey_core::IndicatorService;
use biosurvey_core::config::JobsConfig;

use crate::error::JobError;
use crate::job::JobStatus;
use crate::status::JobStatusStore;

/// Capacity of the job status broadcast channel.
///
/// Subscribers that fall further behind receive
/// [`broadcast::error::RecvError::Lagged`] and skip ahead.
pub const STATUS_BROADCAST_CAPACITY: usize = 256;

/// Handles and settings shared by the worker and every job function.
#[derive(Clone)]
pub struct JobContext {
    /// Survey data access.
    pub service: IndicatorService,
    /// Where status transitions are recorded.
    pub statuses: Arc<dyn JobStatusStore>,
    /// Output directories, retention, queue size.
    pub config: JobsConfig,
    /// Live status feed for `WebSocket` subscribers.
    pub events: broadcast::Sender<JobStatus>,
}

impl JobContext {
    /// Create a context with a fresh broadcast channel.
    pub fn new(service: IndicatorService, statuses: Arc<dyn JobStatusStore>, config: JobsConfig) -> Self {
        let (events, _) = broadcast::channel(STATUS_BROADCAST_CAPACITY);
        Self {
            service,
            statuses,
            config,
            events,
        }
    }

    /// Record `status` and push it to subscribers.
    ///
    /// # Errors
    ///
    /// Returns the status store's error; subscribers are only notified
    /// after a successful write.
    pub async fn publish(&self, status: &JobStatus) -> Result<(), JobError> {
        self.statuses.put(status).await?;
        // No receivers is not an error.
        let _ = self.events.send(status.clone());
        Ok(())
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> broadcast::Receiver<JobStatus> {
        self.events.subscribe()
    }
}

/// Progress reporter handed to running jobs.
pub struct Progress<'a> {
    ctx: &'a JobContext,
    status: JobStatus,
}

impl<'a> Progress<'a> {
    /// Wrap the status of a job about to run.
    pub const fn new(ctx: &'a JobContext, status: JobStatus) -> Self {
        Self { ctx, status }
    }

    /// Move to `percent` and publish. Status store failures are logged
    /// and do not abort the job.
    pub async fn advance(&mut self, percent: u8) {
        self.status.advance(percent, Utc::now());
        if let Err(e) = self.ctx.publish(&self.status).await {
            warn!(job_id = %self.status.job_id, progress = percent, error = %e, "failed to record job progress");
        }
    }

    /// The status as last advanced.
    pub const fn status(&self) -> &JobStatus {
        &self.status
    }

    /// Take the status back for the terminal transition.
    pub fn into_status(self) -> JobStatus {
        self.status
    }
}
