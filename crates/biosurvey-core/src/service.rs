//! Indicator service: authorization, record loading, and engine dispatch.
//!
//! Each operation takes the calling [`Principal`] explicitly, runs the
//! capability check for the target project first, loads the project's
//! observations through the [`SurveyStore`], and hands the filtered records
//! to the pure engine in `biosurvey-indicators`.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use biosurvey_indicators::{
    DiversityIndices, ObservationFilter, PeriodComparison, ProjectSummary, SpatialCell, SpeciesAbundance,
    TimeSeries, TimeSeriesPoint, aggregate_by_time, build_spatial_grid, build_time_series, compare_periods,
    compute_diversity, species_abundances, summarize_project,
};
use biosurvey_types::{
    Indicator, IndicatorId, IndicatorMetricType, Observation, ObservationRecord, Project, ProjectId, Species,
    SpeciesId, UserId,
};

use crate::access::{AccessError, Principal, require_active, require_indicator_management, require_project_access};
use crate::config::IndicatorsConfig;
use crate::store::{StoreError, SurveyStore};
use crate::validation::{ComparisonRequest, NewIndicator, SpatialRequest, TimeSeriesRequest, ValidationFailure};

/// Errors surfaced by service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The caller may not perform the operation.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The request failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// The target entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Requested identifier.
        id: String,
    },

    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Spatial grid with the cell size it was built for.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SpatialGrid {
    /// Cell size in degrees.
    pub grid_size: f64,
    /// Non-empty cells.
    pub cells: Vec<SpatialCell>,
}

/// Shared entry point for every indicator operation.
#[derive(Clone)]
pub struct IndicatorService {
    store: Arc<dyn SurveyStore>,
    defaults: IndicatorsConfig,
}

impl IndicatorService {
    /// Create a service over `store`.
    pub fn new(store: Arc<dyn SurveyStore>, defaults: IndicatorsConfig) -> Self {
        Self { store, defaults }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn SurveyStore> {
        &self.store
    }

    /// Query defaults used to fill omitted parameters.
    pub const fn defaults(&self) -> &IndicatorsConfig {
        &self.defaults
    }

    /// Resolve the user named by the authentication gateway into an active
    /// principal.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unauthenticated`] when no id was given or the user is
    /// unknown; [`AccessError::Inactive`] for disabled accounts.
    pub async fn authenticate(&self, user_id: Option<UserId>) -> Result<Principal, ServiceError> {
        let id = user_id.ok_or(AccessError::Unauthenticated)?;
        let user = self.store.user(id).await?.ok_or(AccessError::Unauthenticated)?;
        let principal = Principal::from(&user);
        require_active(&principal)?;
        Ok(principal)
    }

    /// Load `project_id` and check that `principal` may read it.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] or [`ServiceError::Access`].
    pub async fn authorize_project(&self, principal: &Principal, project_id: ProjectId) -> Result<Project, ServiceError> {
        let project = self
            .store
            .project(project_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                entity: "project",
                id: project_id.to_string(),
            })?;
        require_project_access(principal, &project)?;
        Ok(project)
    }

    async fn records(&self, project_id: ProjectId, filter: &ObservationFilter) -> Result<Vec<ObservationRecord>, ServiceError> {
        let observations = self.store.observations(project_id).await?;
        let records: Vec<ObservationRecord> = observations
            .iter()
            .map(Observation::record)
            .filter(|r| filter.matches(r))
            .collect();
        debug!(project_id = %project_id, records = records.len(), "loaded observation records");
        Ok(records)
    }

    /// Diversity indices for the filtered records of a project.
    ///
    /// # Errors
    ///
    /// Access, lookup, or storage failures.
    pub async fn diversity(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        filter: &ObservationFilter,
    ) -> Result<DiversityIndices, ServiceError> {
        self.authorize_project(principal, project_id).await?;
        let records = self.records(project_id, filter).await?;
        Ok(compute_diversity(&records))
    }

    /// Per-species abundance, most abundant first.
    ///
    /// # Errors
    ///
    /// Access, lookup, or storage failures.
    pub async fn species_abundance(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        filter: &ObservationFilter,
    ) -> Result<Vec<SpeciesAbundance>, ServiceError> {
        self.authorize_project(principal, project_id).await?;
        let records = self.records(project_id, filter).await?;
        Ok(species_abundances(&records))
    }

    /// Time series columns.
    ///
    /// # Errors
    ///
    /// Access, lookup, or storage failures.
    pub async fn time_series(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        request: &TimeSeriesRequest,
    ) -> Result<TimeSeries, ServiceError> {
        self.authorize_project(principal, project_id).await?;
        let records = self.records(project_id, &request.filter).await?;
        Ok(build_time_series(&records, request.metric, request.interval))
    }

    /// Bucketed totals as key/value points.
    ///
    /// # Errors
    ///
    /// Access, lookup, or storage failures.
    pub async fn aggregate(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        request: &TimeSeriesRequest,
    ) -> Result<Vec<TimeSeriesPoint>, ServiceError> {
        self.authorize_project(principal, project_id).await?;
        let records = self.records(project_id, &request.filter).await?;
        Ok(aggregate_by_time(&records, request.interval, request.metric))
    }

    /// Spatial density grid.
    ///
    /// # Errors
    ///
    /// Access, lookup, or storage failures.
    pub async fn spatial(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        request: &SpatialRequest,
    ) -> Result<SpatialGrid, ServiceError> {
        self.authorize_project(principal, project_id).await?;
        let records = self.records(project_id, &request.filter).await?;
        Ok(SpatialGrid {
            grid_size: request.grid_size,
            cells: build_spatial_grid(&records, request.grid_size),
        })
    }

    /// Year-over-year diversity comparison.
    ///
    /// # Errors
    ///
    /// Access, lookup, or storage failures.
    pub async fn compare(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        request: &ComparisonRequest,
    ) -> Result<PeriodComparison, ServiceError> {
        self.authorize_project(principal, project_id).await?;
        let records = self.records(project_id, &request.filter).await?;
        Ok(compare_periods(&records, request.baseline_year, request.current_year))
    }

    /// Full project statistics, as used by reports.
    ///
    /// # Errors
    ///
    /// Access, lookup, or storage failures.
    pub async fn summary(&self, principal: &Principal, project_id: ProjectId) -> Result<ProjectSummary, ServiceError> {
        self.authorize_project(principal, project_id).await?;
        let (observations, catalog) = self.observations_with_species(project_id).await?;
        Ok(summarize_project(&observations, &catalog))
    }

    /// Observations of `project_id` and the catalog entries they reference.
    /// No access check; callers must have authorized the project already.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub async fn observations_with_species(
        &self,
        project_id: ProjectId,
    ) -> Result<(Vec<Observation>, Vec<Species>), ServiceError> {
        let observations = self.store.observations(project_id).await?;
        let ids: Vec<SpeciesId> = observations
            .iter()
            .map(|o| o.species_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let catalog = self.store.species(&ids).await?;
        Ok((observations, catalog))
    }

    /// Stored indicators of a project.
    ///
    /// # Errors
    ///
    /// Access, lookup, or storage failures.
    pub async fn list_indicators(&self, principal: &Principal, project_id: ProjectId) -> Result<Vec<Indicator>, ServiceError> {
        self.authorize_project(principal, project_id).await?;
        Ok(self.store.indicators(project_id).await?)
    }

    /// Store a caller-supplied indicator value.
    ///
    /// # Errors
    ///
    /// Access (admin or researcher required), lookup, or storage failures.
    pub async fn create_indicator(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        new: NewIndicator,
        now: DateTime<Utc>,
    ) -> Result<Indicator, ServiceError> {
        let project = self.authorize_project(principal, project_id).await?;
        require_indicator_management(principal, &project)?;
        let indicator = Indicator {
            id: IndicatorId::new(),
            project_id,
            name: new.name,
            description: new.description,
            metric_type: new.metric_type,
            value: new.value,
            unit: new.unit,
            calculation_date: new.calculation_date,
            created_at: now,
        };
        let stored = self.store.insert_indicator(indicator).await?;
        info!(project_id = %project_id, indicator_id = %stored.id, name = %stored.name, "stored indicator");
        Ok(stored)
    }

    /// Compute current diversity and store one indicator row per index
    /// (richness, Shannon, Simpson, evenness). The rows are written as one
    /// batch, so a storage failure leaves none of them behind.
    ///
    /// # Errors
    ///
    /// Access (admin or researcher required), lookup, or storage failures.
    #[allow(clippy::cast_precision_loss)]
    pub async fn snapshot(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Indicator>, ServiceError> {
        let project = self.authorize_project(principal, project_id).await?;
        require_indicator_management(principal, &project)?;
        let records = self.records(project_id, &ObservationFilter::all()).await?;
        let indices = compute_diversity(&records);

        let rows: [(&str, &str, f64, &str); 4] = [
            ("Species richness", "Distinct species observed", indices.species_richness as f64, "species"),
            ("Shannon index", "Shannon-Wiener diversity (natural log)", indices.shannon_index, "nats"),
            ("Simpson index", "Gini-Simpson diversity", indices.simpson_index, "index"),
            ("Evenness", "Pielou evenness", indices.evenness, "ratio"),
        ];
        let indicators = rows
            .into_iter()
            .map(|(name, description, value, unit)| Indicator {
                id: IndicatorId::new(),
                project_id,
                name: name.to_owned(),
                description: Some(description.to_owned()),
                metric_type: IndicatorMetricType::Diversity,
                value: Some(value),
                unit: Some(unit.to_owned()),
                calculation_date: now,
                created_at: now,
            })
            .collect();

        let stored = self.store.insert_indicators(indicators).await?;
        info!(project_id = %project_id, rows = stored.len(), richness = indices.species_richness, "indicator snapshot stored");
        Ok(stored)
    }
}
