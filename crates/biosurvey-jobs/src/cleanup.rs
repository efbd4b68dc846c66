//! Removal of expired export and report files.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::{JobContext, Progress};
use crate::error::JobError;
use crate::job::ArtifactKind;

const SECS_PER_DAY: u64 = 86_400;

/// Outcome of a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Files deleted.
    pub removed: u64,
    /// Files still within retention.
    pub kept: u64,
    /// Expired files that could not be deleted.
    pub failed: u64,
}

/// Retention window for `days` days.
pub fn retention(days: u32) -> Duration {
    Duration::from_secs(u64::from(days).saturating_mul(SECS_PER_DAY))
}

/// Delete regular files in `dirs` last modified more than `retention`
/// before `now`. Missing directories are skipped; sub-directories are
/// left alone. A file that cannot be deleted is logged and counted in
/// [`CleanupReport::failed`] without stopping the pass.
///
/// # Errors
///
/// Returns [`JobError::Io`] if a directory cannot be listed or a file
/// cannot be inspected.
pub async fn remove_expired(dirs: &[PathBuf], retention: Duration, now: SystemTime) -> Result<CleanupReport, JobError> {
    let mut report = CleanupReport::default();
    let mut expired = Vec::new();
    for dir in dirs {
        report.kept = report.kept.saturating_add(collect_expired(dir, retention, now, &mut expired).await?);
    }
    let (removed, failed) = remove_files(&expired).await;
    report.removed = removed;
    report.failed = failed;
    Ok(report)
}

/// Push expired files of `dir` onto `expired`; returns how many were kept.
async fn collect_expired(
    dir: &Path,
    retention: Duration,
    now: SystemTime,
    expired: &mut Vec<PathBuf>,
) -> Result<u64, JobError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(JobError::io(dir, e)),
    };
    let mut kept = 0u64;
    while let Some(entry) = entries.next_entry().await.map_err(|e| JobError::io(dir, e))? {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| JobError::io(&path, e))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().map_err(|e| JobError::io(&path, e))?;
        // Files stamped in the future count as fresh.
        let age = now.duration_since(modified).unwrap_or_default();
        if age > retention {
            expired.push(path);
        } else {
            kept = kept.saturating_add(1);
        }
    }
    Ok(kept)
}

/// Remove every path, returning `(removed, failed)`.
async fn remove_files(paths: &[PathBuf]) -> (u64, u64) {
    let (mut removed, mut failed) = (0u64, 0u64);
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(file = %path.display(), "removed expired file");
                removed = removed.saturating_add(1);
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to remove expired file");
                failed = failed.saturating_add(1);
            }
        }
    }
    (removed, failed)
}

/// Run a cleanup job over the export and report directories.
///
/// # Errors
///
/// See [`remove_expired`].
pub async fn run_cleanup(ctx: &JobContext, progress: &mut Progress<'_>) -> Result<CleanupReport, JobError> {
    progress.advance(10).await;
    let dirs = [ArtifactKind::Export.dir(&ctx.config), ArtifactKind::Report.dir(&ctx.config)];
    let report = remove_expired(&dirs, retention(ctx.config.retention_days), SystemTime::now()).await?;
    info!(
        removed = report.removed,
        kept = report.kept,
        failed = report.failed,
        retention_days = ctx.config.retention_days,
        "expired artifacts cleaned up"
    );
    Ok(report)
}
