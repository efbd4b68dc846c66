//! Operations on the `observations` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use biosurvey_types::{Observation, ObservationId, ProjectId, SpeciesId, UserId};

use crate::error::DbError;

/// Operations on the `observations` table.
pub struct ObservationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ObservationStore<'a> {
    /// Create a new observation store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All observations of a project, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query or a row conversion fails.
    pub async fn list_for_project(&self, project: ProjectId) -> Result<Vec<Observation>, DbError> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r"SELECT id, project_id, species_id, observer_id, observation_date, latitude, longitude,
                     location_name, count, behavior, habitat_description, weather_conditions, notes,
                     accuracy, altitude, created_at
              FROM observations
              WHERE project_id = $1
              ORDER BY observation_date ASC, id ASC",
        )
        .bind(project.into_inner())
        .fetch_all(self.pool)
        .await?;

        tracing::debug!(project_id = %project, rows = rows.len(), "Loaded observations");
        rows.into_iter().map(Observation::try_from).collect()
    }

    /// Insert an observation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::OutOfRange`] if `count` does not fit the column,
    /// or [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, obs: &Observation) -> Result<(), DbError> {
        let Ok(count) = i32::try_from(obs.count) else {
            return Err(DbError::OutOfRange {
                column: "observations.count",
                value: i64::from(obs.count),
            });
        };

        sqlx::query(
            r"INSERT INTO observations (id, project_id, species_id, observer_id, observation_date, latitude,
                                        longitude, location_name, count, behavior, habitat_description,
                                        weather_conditions, notes, accuracy, altitude, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(obs.id.into_inner())
        .bind(obs.project_id.into_inner())
        .bind(obs.species_id.into_inner())
        .bind(obs.observer_id.into_inner())
        .bind(obs.observed_at)
        .bind(obs.latitude)
        .bind(obs.longitude)
        .bind(obs.location_name.as_deref())
        .bind(count)
        .bind(obs.behavior.as_deref())
        .bind(obs.habitat_description.as_deref())
        .bind(obs.weather_conditions.as_deref())
        .bind(obs.notes.as_deref())
        .bind(obs.accuracy)
        .bind(obs.altitude)
        .bind(obs.created_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// A row from the `observations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ObservationRow {
    /// Observation UUID.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Observed species.
    pub species_id: Uuid,
    /// Observer.
    pub observer_id: Uuid,
    /// When the individuals were seen.
    pub observation_date: DateTime<Utc>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Place name.
    pub location_name: Option<String>,
    /// Individuals observed (`CHECK count >= 1`).
    pub count: i32,
    /// Behavior notes.
    pub behavior: Option<String>,
    /// Habitat notes.
    pub habitat_description: Option<String>,
    /// Weather notes.
    pub weather_conditions: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// GPS accuracy in meters.
    pub accuracy: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = DbError;

    fn try_from(row: ObservationRow) -> Result<Self, Self::Error> {
        let count = u32::try_from(row.count)
            .ok()
            .filter(|&c| c >= 1)
            .ok_or(DbError::OutOfRange {
                column: "observations.count",
                value: i64::from(row.count),
            })?;
        Ok(Self {
            id: ObservationId::from(row.id),
            project_id: ProjectId::from(row.project_id),
            species_id: SpeciesId::from(row.species_id),
            observer_id: UserId::from(row.observer_id),
            observed_at: row.observation_date,
            latitude: row.latitude,
            longitude: row.longitude,
            location_name: row.location_name,
            count,
            behavior: row.behavior,
            habitat_description: row.habitat_description,
            weather_conditions: row.weather_conditions,
            notes: row.notes,
            accuracy: row.accuracy,
            altitude: row.altitude,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(count: i32) -> ObservationRow {
        ObservationRow {
            id: Uuid::now_v7(),
            project_id: Uuid::now_v7(),
            species_id: Uuid::now_v7(),
            observer_id: Uuid::now_v7(),
            observation_date: Utc::now(),
            latitude: -3.0,
            longitude: 37.0,
            location_name: None,
            count,
            behavior: None,
            habitat_description: None,
            weather_conditions: None,
            notes: None,
            accuracy: Some(4.5),
            altitude: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn positive_count_converts() {
        let obs = Observation::try_from(row(12)).unwrap();
        assert_eq!(obs.count, 12);
        assert_eq!(obs.accuracy, Some(4.5));
    }

    #[test]
    fn non_positive_count_is_rejected() {
        assert!(matches!(Observation::try_from(row(0)), Err(DbError::OutOfRange { .. })));
        assert!(matches!(Observation::try_from(row(-4)), Err(DbError::OutOfRange { .. })));
    }
}
