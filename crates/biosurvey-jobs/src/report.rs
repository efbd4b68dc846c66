//! HTML project reports rendered with `minijinja`.

use chrono::{DateTime, Utc};
use minijinja::{Environment, context};
use tracing::info;

use biosurvey_indicators::{ProjectSummary, summarize_project};
use biosurvey_types::{JobId, Project, ProjectId};

use crate::context::{JobContext, Progress};
use crate::error::JobError;
use crate::job::{ArtifactKind, JobArtifact, artifact_suffix};

const TEMPLATE_NAME: &str = "project_report.html";

const REPORT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ project.name }} - biodiversity report</title>
<style>
body { font-family: sans-serif; margin: 2rem; color: #1b2a1b; }
table { border-collapse: collapse; margin-bottom: 1.5rem; }
th, td { border: 1px solid #9bb59b; padding: 0.3rem 0.6rem; text-align: left; }
th { background: #e4efe4; }
</style>
</head>
<body>
<h1>{{ project.name }}</h1>
<p>Status: {{ project.status }}{% if project.location %} | Location: {{ project.location }}{% endif %}</p>
{% if project.description %}<p>{{ project.description }}</p>{% endif %}
<p>Generated {{ generated_at }}</p>

<h2>Overview</h2>
<table>
<tr><th>Observations</th><td>{{ summary.total_observations }}</td></tr>
<tr><th>Species</th><td>{{ summary.unique_species }}</td></tr>
<tr><th>Individuals</th><td>{{ summary.total_individuals }}</td></tr>
<tr><th>Observers</th><td>{{ summary.unique_observers }}</td></tr>
<tr><th>First observation</th><td>{{ summary.first_observation or "-" }}</td></tr>
<tr><th>Last observation</th><td>{{ summary.last_observation or "-" }}</td></tr>
</table>

<h2>Diversity</h2>
<table>
<tr><th>Species richness</th><td>{{ summary.diversity.species_richness }}</td></tr>
<tr><th>Shannon index</th><td>{{ summary.diversity.shannon_index|round(4) }}</td></tr>
<tr><th>Simpson index</th><td>{{ summary.diversity.simpson_index|round(4) }}</td></tr>
<tr><th>Evenness</th><td>{{ summary.diversity.evenness|round(4) }}</td></tr>
</table>

<h2>Species</h2>
{% if summary.species_breakdown %}
<table>
<tr><th>Scientific name</th><th>Common name</th><th>Status</th><th>Individuals</th><th>Observations</th></tr>
{% for s in summary.species_breakdown %}
<tr><td><em>{{ s.scientific_name }}</em></td><td>{{ s.common_name }}</td><td>{% if s.conservation_status %}{{ s.conservation_status }}{% else %}unknown{% endif %}</td><td>{{ s.total_count }}</td><td>{{ s.observation_count }}</td></tr>
{% endfor %}
</table>
{% else %}
<p>No observations recorded.</p>
{% endif %}

<h2>Conservation status</h2>
<table>
{% for status, count in summary.conservation_counts|items %}
<tr><th>{{ status }}</th><td>{{ count }}</td></tr>
{% endfor %}
</table>

{% if summary.extent %}
<h2>Geographic extent</h2>
<table>
<tr><th>Latitude</th><td>{{ summary.extent.bounds.min_latitude|round(5) }} to {{ summary.extent.bounds.max_latitude|round(5) }}</td></tr>
<tr><th>Longitude</th><td>{{ summary.extent.bounds.min_longitude|round(5) }} to {{ summary.extent.bounds.max_longitude|round(5) }}</td></tr>
<tr><th>Diagonal</th><td>{{ summary.extent.diagonal_km|round(2) }} km</td></tr>
</table>
{% endif %}
</body>
</html>
"#;

/// Render the HTML report of `project`.
///
/// # Errors
///
/// Returns [`JobError::Template`] if rendering fails.
pub fn render_report(project: &Project, summary: &ProjectSummary, generated_at: DateTime<Utc>) -> Result<String, JobError> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, REPORT_TEMPLATE)?;
    let template = env.get_template(TEMPLATE_NAME)?;
    Ok(template.render(context! {
        project => project,
        summary => summary,
        generated_at => generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    })?)
}

/// `report_{project}_{YYYYmmdd_HHMMSS}_{suffix}.html`, with the same job-id
/// suffix as exports.
pub fn report_filename(project_id: ProjectId, job_id: JobId, now: DateTime<Utc>) -> String {
    format!(
        "report_{project_id}_{}_{}.html",
        now.format("%Y%m%d_%H%M%S"),
        artifact_suffix(job_id)
    )
}

/// Run a report job.
///
/// # Errors
///
/// [`JobError::ProjectNotFound`], storage, rendering, or file system
/// failures.
pub async fn run_report(ctx: &JobContext, progress: &mut Progress<'_>, project_id: ProjectId) -> Result<JobArtifact, JobError> {
    progress.advance(10).await;

    let project = ctx
        .service
        .store()
        .project(project_id)
        .await?
        .ok_or(JobError::ProjectNotFound(project_id))?;
    let (observations, catalog) = ctx.service.observations_with_species(project_id).await?;
    let summary = summarize_project(&observations, &catalog);
    progress.advance(30).await;

    let now = Utc::now();
    let html = render_report(&project, &summary, now)?;
    progress.advance(70).await;

    let dir = ArtifactKind::Report.dir(&ctx.config);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| JobError::io(&dir, e))?;
    let filename = report_filename(project_id, progress.status().job_id, now);
    let path = dir.join(&filename);
    tokio::fs::write(&path, html.as_bytes()).await.map_err(|e| JobError::io(&path, e))?;

    info!(
        project_id = %project_id,
        observations = summary.total_observations,
        species = summary.unique_species,
        file = %filename,
        "project report written"
    );
    Ok(JobArtifact::new(ArtifactKind::Report, filename))
}
