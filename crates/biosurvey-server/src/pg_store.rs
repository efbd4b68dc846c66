//! [`SurveyStore`] over the `PostgreSQL` table stores.

use async_trait::async_trait;

use biosurvey_core::{StoreError, SurveyStore};
use biosurvey_db::{
    IndicatorStore, ObservationStore, PostgresPool, ProjectStore, SpeciesStore, UserStore,
};
use biosurvey_types::{Indicator, Observation, Project, ProjectId, Species, SpeciesId, User, UserId};

/// Survey data served from `PostgreSQL`.
pub struct PostgresSurveyStore {
    pool: PostgresPool,
}

impl PostgresSurveyStore {
    /// Wrap a connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SurveyStore for PostgresSurveyStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        UserStore::new(self.pool.pool()).get(id).await.map_err(StoreError::backend)
    }

    async fn users(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        UserStore::new(self.pool.pool()).get_many(ids).await.map_err(StoreError::backend)
    }

    async fn project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        ProjectStore::new(self.pool.pool()).get(id).await.map_err(StoreError::backend)
    }

    async fn observations(&self, project: ProjectId) -> Result<Vec<Observation>, StoreError> {
        ObservationStore::new(self.pool.pool())
            .list_for_project(project)
            .await
            .map_err(StoreError::backend)
    }

    async fn species(&self, ids: &[SpeciesId]) -> Result<Vec<Species>, StoreError> {
        SpeciesStore::new(self.pool.pool()).get_many(ids).await.map_err(StoreError::backend)
    }

    async fn indicators(&self, project: ProjectId) -> Result<Vec<Indicator>, StoreError> {
        IndicatorStore::new(self.pool.pool())
            .list_for_project(project)
            .await
            .map_err(StoreError::backend)
    }

    async fn insert_indicator(&self, indicator: Indicator) -> Result<Indicator, StoreError> {
        match IndicatorStore::new(self.pool.pool()).insert(&indicator).await {
            Ok(stored) => Ok(stored),
            Err(e) if e.is_foreign_key_violation() => Err(StoreError::MissingReference {
                entity: "project",
                id: indicator.project_id.to_string(),
            }),
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn insert_indicators(&self, indicators: Vec<Indicator>) -> Result<Vec<Indicator>, StoreError> {
        match IndicatorStore::new(self.pool.pool()).insert_many(&indicators).await {
            Ok(stored) => Ok(stored),
            Err(e) if e.is_foreign_key_violation() => Err(StoreError::MissingReference {
                entity: "project",
                id: indicators
                    .first()
                    .map(|i| i.project_id.to_string())
                    .unwrap_or_default(),
            }),
            Err(e) => Err(StoreError::backend(e)),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.pool.ping().await.map_err(StoreError::backend)
    }
}
