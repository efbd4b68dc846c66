//! Storage boundary for the indicator service and background jobs.
//!
//! [`SurveyStore`] is the read-mostly view the service needs over users,
//! projects, the species catalog, observations, and stored indicators. The
//! server adapts the `PostgreSQL` stores to it; [`InMemoryStore`] backs
//! tests and the no-database development mode.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use biosurvey_types::{Indicator, Observation, Project, ProjectId, Species, SpeciesId, User, UserId};

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not complete the operation.
    #[error("storage backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },

    /// A referenced row does not exist.
    #[error("{entity} {id} does not exist")]
    MissingReference {
        /// Entity kind, e.g. `"project"`.
        entity: &'static str,
        /// The missing identifier.
        id: String,
    },
}

impl StoreError {
    /// Wrap any displayable backend error.
    pub fn backend(err: impl core::fmt::Display) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

/// Read access to survey data plus indicator persistence.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one instance is shared by every
/// request handler and the job worker.
#[async_trait]
pub trait SurveyStore: Send + Sync {
    /// Look up a user.
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Look up several users; missing ids are skipped.
    async fn users(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError>;

    /// Look up a project with its member set.
    async fn project(&self, id: ProjectId) -> Result<Option<Project>, StoreError>;

    /// Every observation logged under `project`, oldest first.
    async fn observations(&self, project: ProjectId) -> Result<Vec<Observation>, StoreError>;

    /// Look up catalog entries; missing ids are skipped.
    async fn species(&self, ids: &[SpeciesId]) -> Result<Vec<Species>, StoreError>;

    /// Stored indicators of `project`, newest calculation first.
    async fn indicators(&self, project: ProjectId) -> Result<Vec<Indicator>, StoreError>;

    /// Persist a stored indicator.
    async fn insert_indicator(&self, indicator: Indicator) -> Result<Indicator, StoreError>;

    /// Persist several stored indicators atomically: on error none of them
    /// is kept.
    async fn insert_indicators(&self, indicators: Vec<Indicator>) -> Result<Vec<Indicator>, StoreError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryData {
    users: BTreeMap<UserId, User>,
    projects: BTreeMap<ProjectId, Project>,
    species: BTreeMap<SpeciesId, Species>,
    observations: Vec<Observation>,
    indicators: Vec<Indicator>,
}

/// In-memory [`SurveyStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<MemoryData>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub async fn put_user(&self, user: User) {
        self.data.write().await.users.insert(user.id, user);
    }

    /// Insert or replace a project.
    pub async fn put_project(&self, project: Project) {
        self.data.write().await.projects.insert(project.id, project);
    }

    /// Insert or replace a catalog entry.
    pub async fn put_species(&self, species: Species) {
        self.data.write().await.species.insert(species.id, species);
    }

    /// Append an observation.
    pub async fn put_observation(&self, observation: Observation) {
        self.data.write().await.observations.push(observation);
    }
}

#[async_trait]
impl SurveyStore for InMemoryStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.data.read().await.users.get(&id).cloned())
    }

    async fn users(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        let data = self.data.read().await;
        Ok(ids.iter().filter_map(|id| data.users.get(id).cloned()).collect())
    }

    async fn project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self.data.read().await.projects.get(&id).cloned())
    }

    async fn observations(&self, project: ProjectId) -> Result<Vec<Observation>, StoreError> {
        let data = self.data.read().await;
        let mut rows: Vec<Observation> = data
            .observations
            .iter()
            .filter(|o| o.project_id == project)
            .cloned()
            .collect();
        rows.sort_by_key(|o| o.observed_at);
        Ok(rows)
    }

    async fn species(&self, ids: &[SpeciesId]) -> Result<Vec<Species>, StoreError> {
        let data = self.data.read().await;
        Ok(ids.iter().filter_map(|id| data.species.get(id).cloned()).collect())
    }

    async fn indicators(&self, project: ProjectId) -> Result<Vec<Indicator>, StoreError> {
        let data = self.data.read().await;
        let mut rows: Vec<Indicator> = data
            .indicators
            .iter()
            .filter(|i| i.project_id == project)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.calculation_date.cmp(&a.calculation_date));
        Ok(rows)
    }

    async fn insert_indicator(&self, indicator: Indicator) -> Result<Indicator, StoreError> {
        let mut data = self.data.write().await;
        if !data.projects.contains_key(&indicator.project_id) {
            return Err(StoreError::MissingReference {
                entity: "project",
                id: indicator.project_id.to_string(),
            });
        }
        data.indicators.push(indicator.clone());
        Ok(indicator)
    }

    async fn insert_indicators(&self, indicators: Vec<Indicator>) -> Result<Vec<Indicator>, StoreError> {
        let mut data = self.data.write().await;
        if let Some(orphan) = indicators.iter().find(|i| !data.projects.contains_key(&i.project_id)) {
            return Err(StoreError::MissingReference {
                entity: "project",
                id: orphan.project_id.to_string(),
            });
        }
        data.indicators.extend(indicators.iter().cloned());
        Ok(indicators)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
