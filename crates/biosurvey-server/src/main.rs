//! Server binary for the biosurvey indicator backend.
//!
//! Wires the survey store, the job status store, the background job
//! worker, and the HTTP API together, then serves until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `biosurvey-config.yaml` (or the path in
//!    `BIOSURVEY_CONFIG`) with environment overrides
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and run migrations, or fall back to an empty
//!    in-memory store
//! 4. Connect to `Dragonfly` for job status, or keep it in memory
//! 5. Start the job worker and the cleanup schedule
//! 6. Serve the API until Ctrl-C
//! 7. Drain queued jobs and exit

mod error;
mod job_status;
mod logging;
mod pg_store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use biosurvey_api::{AppState, start_server};
use biosurvey_core::{BiosurveyConfig, InMemoryStore, IndicatorService, SurveyStore};
use biosurvey_db::{DragonflyPool, PostgresConfig, PostgresPool};
use biosurvey_jobs::{InMemoryJobStatusStore, JobContext, JobQueue, JobStatusStore, spawn_cleanup_schedule};
use tracing::{info, warn};

use crate::error::ServerError;
use crate::job_status::DragonflyJobStatusStore;
use crate::pg_store::PostgresSurveyStore;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "biosurvey-config.yaml";

/// How long queued jobs may run after the API stops accepting requests.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, a configured backend, or the HTTP
/// listener fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path(std::env::var("BIOSURVEY_CONFIG").ok());
    let config = BiosurveyConfig::load_or_default(&config_path).map_err(ServerError::from)?;

    // 2. Initialize structured logging.
    logging::init(&config.logging)?;
    info!(
        path = %config_path.display(),
        host = config.server.host,
        port = config.server.port,
        output_dir = %config.jobs.output_dir.display(),
        "biosurvey-server starting"
    );

    // 3. Survey store.
    let store = connect_survey_store(&config).await?;

    // 4. Job status store.
    let statuses = connect_status_store(&config).await?;

    // 5. Job worker and cleanup schedule.
    let service = IndicatorService::new(store, config.indicators.clone());
    let ctx = JobContext::new(service.clone(), statuses, config.jobs.clone());
    let (queue, worker) = JobQueue::start(ctx);
    let cleanup = spawn_cleanup_schedule(
        queue.clone(),
        Duration::from_secs(config.jobs.cleanup_interval_secs),
    );

    // 6. Serve.
    let state = Arc::new(AppState::new(service, queue));
    start_server(&config.server, state, shutdown_signal())
        .await
        .map_err(ServerError::from)?;

    // 7. Drain. The worker exits once every queue handle is gone.
    cleanup.abort();
    if tokio::time::timeout(DRAIN_TIMEOUT, worker).await.is_err() {
        warn!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "job worker did not drain in time");
    }

    info!("biosurvey-server stopped");
    Ok(())
}

/// Pick the configuration file: an explicit override, else the default.
fn config_path(explicit: Option<String>) -> PathBuf {
    explicit
        .filter(|p| !p.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

async fn connect_survey_store(config: &BiosurveyConfig) -> Result<Arc<dyn SurveyStore>, ServerError> {
    let Some(url) = config.database.url.as_deref() else {
        warn!("database.url not set, serving an empty in-memory store");
        return Ok(Arc::new(InMemoryStore::new()));
    };

    let pg_config = PostgresConfig::new(url)
        .with_max_connections(config.database.max_connections)
        .with_min_connections(config.database.min_connections)
        .with_acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs));
    let pool = PostgresPool::connect(&pg_config).await?;
    if config.database.run_migrations {
        pool.run_migrations().await?;
    }
    Ok(Arc::new(PostgresSurveyStore::new(pool)))
}

async fn connect_status_store(config: &BiosurveyConfig) -> Result<Arc<dyn JobStatusStore>, ServerError> {
    let Some(url) = config.dragonfly.url.as_deref() else {
        info!("dragonfly.url not set, keeping job status in memory");
        return Ok(Arc::new(InMemoryJobStatusStore::with_ttl(
            config.dragonfly.job_status_ttl_secs,
        )));
    };

    let pool = DragonflyPool::connect(url).await?;
    Ok(Arc::new(DragonflyJobStatusStore::new(
        pool,
        config.dragonfly.job_status_ttl_secs,
    )))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl-C, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_prefers_explicit_override() {
        assert_eq!(
            config_path(Some("/etc/biosurvey.yaml".to_owned())),
            PathBuf::from("/etc/biosurvey.yaml")
        );
    }

    #[test]
    fn config_path_falls_back_to_default() {
        assert_eq!(config_path(None), PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(config_path(Some("  ".to_owned())), PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[tokio::test]
    async fn missing_database_url_uses_memory_store() {
        let config = BiosurveyConfig::default();
        let store = connect_survey_store(&config).await.unwrap();
        store.ping().await.unwrap();
        assert!(store.observations(biosurvey_types::ProjectId::new()).await.unwrap().is_empty());
    }
}
