//! Background jobs for the biosurvey backend.
//!
//! Jobs run on a single in-process worker fed by a bounded channel. Every
//! job function receives its [`JobContext`] explicitly; there is no global
//! application state. Status moves `queued -> running -> completed | failed`
//! and each transition is written to a [`JobStatusStore`] and broadcast to
//! live subscribers.
//!
//! # Modules
//!
//! - [`job`] -- job kinds, status, artifacts
//! - [`status`] -- status persistence trait and in-memory store
//! - [`context`] -- injected handles and progress reporting
//! - [`queue`] -- the bounded queue, worker, and cleanup schedule
//! - [`export`] -- CSV/JSON observation exports
//! - [`report`] -- HTML project reports
//! - [`cleanup`] -- retention-based artifact removal

pub mod cleanup;
pub mod context;
pub mod error;
pub mod export;
pub mod job;
pub mod queue;
pub mod report;
pub mod status;

pub use context::JobContext;
pub use error::JobError;
pub use job::{ArtifactKind, Job, JobArtifact, JobKind, JobState, JobStatus};
pub use queue::{JobQueue, spawn_cleanup_schedule};
pub use status::{InMemoryJobStatusStore, JobStatusStore};
