//! Job descriptions and their observable status.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use biosurvey_core::config::JobsConfig;
use biosurvey_core::validation::ExportRequest;
use biosurvey_types::{JobId, ProjectId, UserId};

/// What a job does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Write the project's observations to a CSV or JSON file.
    ExportObservations {
        /// Source project.
        project_id: ProjectId,
        /// Format and record selection.
        request: ExportRequest,
    },
    /// Render the project's statistics into an HTML report.
    ProjectReport {
        /// Source project.
        project_id: ProjectId,
    },
    /// Delete expired export and report files.
    Cleanup,
}

impl JobKind {
    /// Short label shown in job status.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ExportObservations { .. } => "export",
            Self::ProjectReport { .. } => "report",
            Self::Cleanup => "cleanup",
        }
    }

    /// The project a job reads from, if any.
    pub const fn project_id(&self) -> Option<ProjectId> {
        match self {
            Self::ExportObservations { project_id, .. } | Self::ProjectReport { project_id } => Some(*project_id),
            Self::Cleanup => None,
        }
    }
}

/// A queued unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    /// Unique job identifier.
    pub id: JobId,
    /// What to do.
    pub kind: JobKind,
    /// The user who asked for it; `None` for scheduled jobs.
    pub submitted_by: Option<UserId>,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a job with a fresh id.
    pub fn new(kind: JobKind, submitted_by: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            kind,
            submitted_by,
            created_at: now,
        }
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting for the worker.
    Queued,
    /// Being processed; see `progress`.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl JobState {
    /// Whether the job has finished, successfully or not.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Directory an artifact is written to under the output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Observation exports.
    Export,
    /// Rendered reports.
    Report,
}

impl ArtifactKind {
    /// Sub-directory name, also used in download URLs.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Export => "exports",
            Self::Report => "reports",
        }
    }

    /// Parse a download URL segment.
    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "exports" => Some(Self::Export),
            "reports" => Some(Self::Report),
            _ => None,
        }
    }

    /// Absolute directory for this kind.
    pub fn dir(self, config: &JobsConfig) -> PathBuf {
        match self {
            Self::Export => config.exports_dir(),
            Self::Report => config.reports_dir(),
        }
    }

    /// Resolve a downloadable file name inside this kind's directory.
    ///
    /// Returns `None` for names that could escape the directory: empty
    /// names, names with path separators, and dot-prefixed names.
    pub fn resolve(self, config: &JobsConfig, filename: &str) -> Option<PathBuf> {
        let plain = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains(['/', '\\'])
            && Path::new(filename).file_name().is_some_and(|n| n == filename);
        plain.then(|| self.dir(config).join(filename))
    }

    /// Public download URL of `filename`.
    pub fn download_url(self, filename: &str) -> String {
        format!("/api/downloads/{}/{filename}", self.dir_name())
    }

    /// The project an artifact was generated for, read from its name
    /// (`observations_{project}_...` or `report_{project}_...`).
    pub fn project_of(self, filename: &str) -> Option<ProjectId> {
        let prefix = match self {
            Self::Export => "observations_",
            Self::Report => "report_",
        };
        filename.strip_prefix(prefix)?.get(..36)?.parse().ok()
    }
}

/// Last eight hex digits of `job_id`, appended to artifact names so jobs
/// finishing in the same second write distinct files.
pub fn artifact_suffix(job_id: JobId) -> String {
    let simple = job_id.into_inner().simple().to_string();
    simple.get(24..).unwrap_or(&simple).to_owned()
}

/// A file produced by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct JobArtifact {
    /// File name within its directory.
    pub filename: String,
    /// Where to download it.
    pub download_url: String,
}

impl JobArtifact {
    /// Describe `filename` written under `kind`.
    pub fn new(kind: ArtifactKind, filename: String) -> Self {
        let download_url = kind.download_url(&filename);
        Self { filename, download_url }
    }
}

/// The latest known status of a job, as stored and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct JobStatus {
    /// Job identifier.
    pub job_id: JobId,
    /// Job label: `export`, `report` or `cleanup`.
    pub kind: String,
    /// Source project, if any.
    pub project_id: Option<ProjectId>,
    /// Lifecycle state.
    pub state: JobState,
    /// Completion percentage, 0 to 100.
    pub progress: u8,
    /// Produced file, once completed.
    pub artifact: Option<JobArtifact>,
    /// Failure description, once failed.
    pub error: Option<String>,
    /// Who submitted the job.
    pub submitted_by: Option<UserId>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    /// Initial status of a freshly submitted job.
    pub fn queued(job: &Job) -> Self {
        Self {
            job_id: job.id,
            kind: job.kind.label().to_owned(),
            project_id: job.kind.project_id(),
            state: JobState::Queued,
            progress: 0,
            artifact: None,
            error: None,
            submitted_by: job.submitted_by,
            created_at: job.created_at,
            updated_at: job.created_at,
        }
    }

    /// Mark running at `progress` percent (capped at 100).
    pub fn advance(&mut self, progress: u8, now: DateTime<Utc>) {
        self.state = JobState::Running;
        self.progress = progress.min(100);
        self.updated_at = now;
    }

    /// Mark completed.
    pub fn complete(&mut self, artifact: Option<JobArtifact>, now: DateTime<Utc>) {
        self.state = JobState::Completed;
        self.progress = 100;
        self.artifact = artifact;
        self.updated_at = now;
    }

    /// Mark failed; progress keeps its last value.
    pub fn fail(&mut self, error: String, now: DateTime<Utc>) {
        self.state = JobState::Failed;
        self.error = Some(error);
        self.updated_at = now;
    }
}
