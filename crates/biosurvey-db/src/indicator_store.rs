//! Operations on the `indicators` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use biosurvey_types::{Indicator, IndicatorId, IndicatorMetricType, ParseEnumError, ProjectId};

use crate::error::DbError;

/// Operations on the `indicators` table.
pub struct IndicatorStore<'a> {
    pool: &'a PgPool,
}

impl<'a> IndicatorStore<'a> {
    /// Create a new indicator store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Stored indicators of a project, newest calculation first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query or a row conversion fails.
    pub async fn list_for_project(&self, project: ProjectId) -> Result<Vec<Indicator>, DbError> {
        let rows = sqlx::query_as::<_, IndicatorRow>(
            r"SELECT id, project_id, name, description, metric_type, value, unit, calculation_date, created_at
              FROM indicators
              WHERE project_id = $1
              ORDER BY calculation_date DESC, name ASC",
        )
        .bind(project.into_inner())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Indicator::try_from).collect()
    }

    /// Insert an indicator and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (including a
    /// foreign-key violation for an unknown project).
    pub async fn insert(&self, indicator: &Indicator) -> Result<Indicator, DbError> {
        insert_with(self.pool, indicator).await
    }

    /// Insert several indicators in one transaction. Either every row is
    /// stored or none is.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any insert or the commit fails.
    pub async fn insert_many(&self, indicators: &[Indicator]) -> Result<Vec<Indicator>, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(indicators.len());
        for indicator in indicators {
            stored.push(insert_with(&mut *tx, indicator).await?);
        }
        tx.commit().await?;
        Ok(stored)
    }
}

async fn insert_with<'e, E: sqlx::PgExecutor<'e>>(executor: E, indicator: &Indicator) -> Result<Indicator, DbError> {
    let row = sqlx::query_as::<_, IndicatorRow>(
        r"INSERT INTO indicators (id, project_id, name, description, metric_type, value, unit, calculation_date, created_at)
          VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
          RETURNING id, project_id, name, description, metric_type, value, unit, calculation_date, created_at",
    )
    .bind(indicator.id.into_inner())
    .bind(indicator.project_id.into_inner())
    .bind(&indicator.name)
    .bind(indicator.description.as_deref())
    .bind(indicator.metric_type.as_str())
    .bind(indicator.value)
    .bind(indicator.unit.as_deref())
    .bind(indicator.calculation_date)
    .bind(indicator.created_at)
    .fetch_one(executor)
    .await?;

    tracing::debug!(indicator_id = %indicator.id, project_id = %indicator.project_id, "Inserted indicator");
    Indicator::try_from(row)
}

/// A row from the `indicators` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IndicatorRow {
    /// Indicator UUID.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Metric type as stored.
    pub metric_type: String,
    /// Value.
    pub value: Option<f64>,
    /// Unit label.
    pub unit: Option<String>,
    /// Calculation timestamp.
    pub calculation_date: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<IndicatorRow> for Indicator {
    type Error = DbError;

    fn try_from(row: IndicatorRow) -> Result<Self, Self::Error> {
        let metric_type: IndicatorMetricType = row.metric_type.parse().map_err(|e: ParseEnumError| DbError::InvalidColumn {
            column: "indicators.metric_type",
            value: e.value,
        })?;
        Ok(Self {
            id: IndicatorId::from(row.id),
            project_id: ProjectId::from(row.project_id),
            name: row.name,
            description: row.description,
            metric_type,
            value: row.value,
            unit: row.unit,
            calculation_date: row.calculation_date,
            created_at: row.created_at,
        })
    }
}
