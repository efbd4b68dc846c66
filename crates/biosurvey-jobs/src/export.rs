//! Observation export to CSV or JSON.
//!
//! Rows are built in memory from the project's observations, the species
//! catalog, and the observers' names, then written in one go under
//! `<output_dir>/exports/`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use biosurvey_core::validation::ExportRequest;
use biosurvey_indicators::ObservationFilter;
use biosurvey_types::{ExportFormat, JobId, Observation, ProjectId, Species, SpeciesId, User, UserId};

use crate::context::{JobContext, Progress};
use crate::error::JobError;
use crate::job::{ArtifactKind, JobArtifact, artifact_suffix};

/// CSV header row, in column order.
pub const CSV_HEADERS: [&str; 13] = [
    "ID",
    "Species Scientific Name",
    "Species Common Name",
    "Observer",
    "Date",
    "Latitude",
    "Longitude",
    "Location",
    "Count",
    "Behavior",
    "Habitat",
    "Weather",
    "Notes",
];

/// One exported observation. Field order matches [`CSV_HEADERS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    /// Observation id.
    pub id: String,
    /// Scientific name, empty if the species is missing from the catalog.
    pub species_scientific_name: String,
    /// Common name, empty if the species is missing from the catalog.
    pub species_common_name: String,
    /// Observer's full name, empty if the user is unknown.
    pub observer: String,
    /// Observation time, RFC 3339.
    pub date: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Place name.
    pub location: Option<String>,
    /// Number of individuals.
    pub count: u32,
    /// Observed behavior.
    pub behavior: Option<String>,
    /// Habitat notes.
    pub habitat: Option<String>,
    /// Weather notes.
    pub weather: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Build export rows for the observations passing `filter`, oldest first.
pub fn export_rows(
    observations: &[Observation],
    catalog: &[Species],
    observers: &[User],
    filter: &ObservationFilter,
) -> Vec<ExportRow> {
    let species: HashMap<SpeciesId, &Species> = catalog.iter().map(|s| (s.id, s)).collect();
    let names: HashMap<UserId, String> = observers.iter().map(|u| (u.id, u.full_name())).collect();

    let mut selected: Vec<&Observation> = observations.iter().filter(|o| filter.matches(&o.record())).collect();
    selected.sort_by_key(|o| o.observed_at);

    selected
        .into_iter()
        .map(|o| {
            let entry = species.get(&o.species_id);
            ExportRow {
                id: o.id.to_string(),
                species_scientific_name: entry.map(|s| s.scientific_name.clone()).unwrap_or_default(),
                species_common_name: entry.map(|s| s.common_name.clone()).unwrap_or_default(),
                observer: names.get(&o.observer_id).cloned().unwrap_or_default(),
                date: o.observed_at.to_rfc3339(),
                latitude: o.latitude,
                longitude: o.longitude,
                location: o.location_name.clone(),
                count: o.count,
                behavior: o.behavior.clone(),
                habitat: o.habitat_description.clone(),
                weather: o.weather_conditions.clone(),
                notes: o.notes.clone(),
            }
        })
        .collect()
}

/// Encode rows as CSV with a header line.
///
/// # Errors
///
/// Returns [`JobError::Csv`] if a row cannot be encoded.
pub fn encode_csv(rows: &[ExportRow]) -> Result<Vec<u8>, JobError> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(CSV_HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| JobError::Csv(csv::Error::from(e.into_error())))
}

/// Encode rows as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns [`JobError::Json`] if encoding fails.
pub fn encode_json(rows: &[ExportRow]) -> Result<Vec<u8>, JobError> {
    Ok(serde_json::to_vec_pretty(rows)?)
}

/// `observations_{project}_{YYYYmmdd_HHMMSS}_{suffix}.{ext}`, where the
/// suffix is the random tail of the job id so same-second exports do not
/// overwrite each other.
pub fn export_filename(project_id: ProjectId, job_id: JobId, format: ExportFormat, now: DateTime<Utc>) -> String {
    let suffix = artifact_suffix(job_id);
    format!(
        "observations_{project_id}_{}_{suffix}.{}",
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Run an export job.
///
/// # Errors
///
/// Storage, encoding, or file system failures.
pub async fn run_export(
    ctx: &JobContext,
    progress: &mut Progress<'_>,
    project_id: ProjectId,
    request: ExportRequest,
) -> Result<JobArtifact, JobError> {
    progress.advance(10).await;

    let (observations, catalog) = ctx.service.observations_with_species(project_id).await?;
    let observer_ids: Vec<UserId> = {
        let mut ids: Vec<UserId> = observations.iter().map(|o| o.observer_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    };
    let observers = ctx.service.store().users(&observer_ids).await?;
    let rows = export_rows(&observations, &catalog, &observers, &request.filter);
    progress.advance(30).await;

    let bytes = match request.format {
        ExportFormat::Csv => encode_csv(&rows)?,
        ExportFormat::Json => encode_json(&rows)?,
    };
    let dir = ArtifactKind::Export.dir(&ctx.config);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| JobError::io(&dir, e))?;
    let filename = export_filename(project_id, progress.status().job_id, request.format, Utc::now());
    let path = dir.join(&filename);
    tokio::fs::write(&path, &bytes).await.map_err(|e| JobError::io(&path, e))?;
    progress.advance(80).await;

    info!(
        project_id = %project_id,
        rows = rows.len(),
        format = %request.format,
        file = %filename,
        "observations exported"
    );
    Ok(JobArtifact::new(ArtifactKind::Export, filename))
}
