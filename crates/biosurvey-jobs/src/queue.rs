//! Bounded job queue and its worker task.
//!
//! [`JobQueue::start`] creates the channel and spawns one worker on the
//! Tokio runtime. Jobs run one at a time in submission order. Submitting
//! never waits: a full queue is reported to the caller immediately.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use biosurvey_types::{JobId, UserId};

use crate::cleanup::run_cleanup;
use crate::context::{JobContext, Progress};
use crate::error::JobError;
use crate::export::run_export;
use crate::job::{Job, JobKind, JobStatus};
use crate::report::run_report;

/// Handle for submitting jobs and reading their status.
#[derive(Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<Job>,
    ctx: JobContext,
}

impl JobQueue {
    /// Create the queue and spawn its worker.
    ///
    /// The worker exits once every [`JobQueue`] clone has been dropped and
    /// the remaining jobs have run.
    pub fn start(ctx: JobContext) -> (Self, JoinHandle<()>) {
        let capacity = ctx.config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_worker(ctx.clone(), receiver));
        info!(capacity, output_dir = %ctx.config.output_dir.display(), "job worker started");
        (Self { sender, ctx }, handle)
    }

    /// Queue a job and return its initial status.
    ///
    /// # Errors
    ///
    /// [`JobError::QueueFull`] when the queue is at capacity,
    /// [`JobError::QueueClosed`] if the worker has stopped, or the status
    /// store's error.
    pub async fn submit(&self, kind: JobKind, submitted_by: Option<UserId>) -> Result<JobStatus, JobError> {
        let permit = self.sender.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(()) => JobError::QueueFull,
            mpsc::error::TrySendError::Closed(()) => JobError::QueueClosed,
        })?;
        let job = Job::new(kind, submitted_by, Utc::now());
        let status = JobStatus::queued(&job);
        self.ctx.publish(&status).await?;
        permit.send(job);
        debug!(job_id = %job.id, kind = job.kind.label(), "job queued");
        Ok(status)
    }

    /// Latest status of `job_id`.
    ///
    /// # Errors
    ///
    /// Returns the status store's error.
    pub async fn status(&self, job_id: JobId) -> Result<Option<JobStatus>, JobError> {
        self.ctx.statuses.get(job_id).await
    }

    /// Subscribe to every status change.
    pub fn subscribe(&self) -> broadcast::Receiver<JobStatus> {
        self.ctx.subscribe()
    }

    /// Settings the queue was started with.
    pub const fn context(&self) -> &JobContext {
        &self.ctx
    }
}

async fn run_worker(ctx: JobContext, mut receiver: mpsc::Receiver<Job>) {
    while let Some(job) = receiver.recv().await {
        execute(&ctx, job).await;
    }
    info!("job worker stopped");
}

/// Run one job to completion and publish its terminal status.
///
/// Failures are recorded on the status rather than returned.
pub async fn execute(ctx: &JobContext, job: Job) -> JobStatus {
    let mut progress = Progress::new(ctx, JobStatus::queued(&job));
    progress.advance(0).await;

    let outcome = match job.kind {
        JobKind::ExportObservations { project_id, request } => {
            run_export(ctx, &mut progress, project_id, request).await.map(Some)
        }
        JobKind::ProjectReport { project_id } => run_report(ctx, &mut progress, project_id).await.map(Some),
        JobKind::Cleanup => run_cleanup(ctx, &mut progress).await.map(|_| None),
    };

    let mut status = progress.into_status();
    match outcome {
        Ok(artifact) => {
            status.complete(artifact, Utc::now());
            info!(job_id = %job.id, kind = job.kind.label(), "job completed");
        }
        Err(e) => {
            error!(job_id = %job.id, kind = job.kind.label(), error = %e, "job failed");
            status.fail(e.to_string(), Utc::now());
        }
    }
    if let Err(e) = ctx.publish(&status).await {
        warn!(job_id = %job.id, error = %e, "failed to record final job status");
    }
    status
}

/// Submit a cleanup job every `every`, starting after one full period.
///
/// A full queue skips that round.
pub fn spawn_cleanup_schedule(queue: JobQueue, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = every.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match queue.submit(JobKind::Cleanup, None).await {
                Ok(status) => debug!(job_id = %status.job_id, "scheduled cleanup queued"),
                Err(JobError::QueueClosed) => break,
                Err(e) => warn!(error = %e, "scheduled cleanup skipped"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use chrono::TimeZone;

    use biosurvey_core::IndicatorService;
    use biosurvey_core::config::{IndicatorsConfig, JobsConfig};
    use biosurvey_core::store::InMemoryStore;
    use biosurvey_core::validation::ExportRequest;
    use biosurvey_indicators::ObservationFilter;
    use biosurvey_types::{ExportFormat, Observation, ObservationId, Project, ProjectId, ProjectStatus, Species, SpeciesId};

    use super::*;
    use crate::job::JobState;
    use crate::status::InMemoryJobStatusStore;

    async fn context(output: &std::path::Path, capacity: usize) -> (JobContext, ProjectId) {
        let store = Arc::new(InMemoryStore::new());
        let project = Project {
            id: ProjectId::new(),
            name: "Forest edge".to_owned(),
            description: None,
            location: None,
            start_date: None,
            end_date: None,
            status: ProjectStatus::Active,
            created_by: UserId::new(),
            members: BTreeSet::new(),
            created_at: Utc::now(),
        };
        store.put_project(project.clone()).await;
        let species = Species {
            id: SpeciesId::new(),
            scientific_name: "Colobus guereza".to_owned(),
            common_name: "Mantled guereza".to_owned(),
            family: None,
            genus: None,
            species_code: None,
            conservation_status: None,
        };
        store.put_species(species.clone()).await;
        for day in [3, 4] {
            let observed_at = Utc.with_ymd_and_hms(2024, 5, day, 6, 0, 0).unwrap();
            store
                .put_observation(Observation {
                    id: ObservationId::new(),
                    project_id: project.id,
                    species_id: species.id,
                    observer_id: UserId::new(),
                    observed_at,
                    latitude: 0.5,
                    longitude: 35.2,
                    location_name: None,
                    count: 6,
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

        let service = IndicatorService::new(store, IndicatorsConfig::default());
        let config = JobsConfig {
            output_dir: output.to_path_buf(),
            queue_capacity: capacity,
            ..JobsConfig::default()
        };
        (JobContext::new(service, Arc::new(InMemoryJobStatusStore::new()), config), project.id)
    }

    async fn wait_terminal(rx: &mut broadcast::Receiver<JobStatus>, job_id: JobId) -> JobStatus {
        loop {
            let status = rx.recv().await.unwrap();
            if status.job_id == job_id && status.state.is_terminal() {
                return status;
            }
        }
    }

    #[tokio::test]
    async fn export_job_writes_csv_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, project_id) = context(dir.path(), 4).await;
        let (queue, _worker) = JobQueue::start(ctx);
        let mut rx = queue.subscribe();

        let queued = queue
            .submit(
                JobKind::ExportObservations {
                    project_id,
                    request: ExportRequest {
                        format: ExportFormat::Csv,
                        filter: ObservationFilter::all(),
                    },
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(queued.state, JobState::Queued);

        let mut seen = Vec::new();
        let done = loop {
            let status = rx.recv().await.unwrap();
            seen.push(status.progress);
            if status.state.is_terminal() {
                break status;
            }
        };
        assert_eq!(done.state, JobState::Completed, "{:?}", done.error);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert!(seen.contains(&30) && seen.contains(&80));

        let artifact = done.artifact.as_ref().unwrap();
        assert!(artifact.download_url.starts_with("/api/downloads/exports/observations_"));
        let text = std::fs::read_to_string(dir.path().join("exports").join(&artifact.filename)).unwrap();
        assert_eq!(text.lines().count(), 3);

        let stored = queue.status(queued.job_id).await.unwrap().unwrap();
        assert_eq!(stored, done);
    }

    #[tokio::test]
    async fn report_job_for_missing_project_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = context(dir.path(), 4).await;
        let (queue, _worker) = JobQueue::start(ctx);
        let mut rx = queue.subscribe();

        let missing = ProjectId::new();
        let queued = queue.submit(JobKind::ProjectReport { project_id: missing }, None).await.unwrap();
        let done = wait_terminal(&mut rx, queued.job_id).await;
        assert_eq!(done.state, JobState::Failed);
        assert!(done.error.unwrap().contains(&missing.to_string()));
    }

    #[tokio::test]
    async fn report_job_writes_html() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, project_id) = context(dir.path(), 4).await;
        let done = execute(&ctx, Job::new(JobKind::ProjectReport { project_id }, None, Utc::now())).await;
        assert_eq!(done.state, JobState::Completed);
        let html = std::fs::read_to_string(dir.path().join("reports").join(done.artifact.unwrap().filename)).unwrap();
        assert!(html.contains("Colobus guereza"));
    }

    #[tokio::test]
    async fn cleanup_job_completes_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = context(dir.path(), 4).await;
        let done = execute(&ctx, Job::new(JobKind::Cleanup, None, Utc::now())).await;
        assert_eq!(done.state, JobState::Completed);
        assert_eq!(done.progress, 100);
        assert!(done.artifact.is_none());
    }

    #[tokio::test]
    async fn full_queue_rejects_submission() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = context(dir.path(), 1).await;
        // A queue without a worker keeps the single slot occupied.
        let (sender, _receiver) = mpsc::channel(1);
        let queue = JobQueue { sender, ctx };

        queue.submit(JobKind::Cleanup, None).await.unwrap();
        let err = queue.submit(JobKind::Cleanup, None).await.unwrap_err();
        assert!(matches!(err, JobError::QueueFull));
    }
}
