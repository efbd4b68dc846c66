//! Shared application state for the API server.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use biosurvey_core::IndicatorService;
use biosurvey_core::config::JobsConfig;
use biosurvey_jobs::{JobQueue, JobStatus};

/// State shared by every handler.
///
/// Both members are cheap handles; the data they reach lives in the
/// survey store and the job status store.
#[derive(Clone)]
pub struct AppState {
    /// Indicator computations and stored indicators.
    pub service: IndicatorService,
    /// Background job submission and status.
    pub jobs: JobQueue,
    /// When the server started.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state around an indicator service and a running job queue.
    pub fn new(service: IndicatorService, jobs: JobQueue) -> Self {
        Self {
            service,
            jobs,
            started_at: Utc::now(),
        }
    }

    /// Subscribe to job status changes.
    pub fn subscribe(&self) -> broadcast::Receiver<JobStatus> {
        self.jobs.subscribe()
    }

    /// Output directories of the job worker.
    pub const fn jobs_config(&self) -> &JobsConfig {
        &self.jobs.context().config
    }
}
