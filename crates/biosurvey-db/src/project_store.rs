//! Operations on the `projects` and `project_members` tables.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use biosurvey_types::{ParseEnumError, Project, ProjectId, ProjectStatus, UserId};

use crate::error::DbError;

/// Operations on the `projects` and `project_members` tables.
pub struct ProjectStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ProjectStore<'a> {
    /// Create a new project store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a project together with its member set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails, or
    /// [`DbError::InvalidColumn`] if the stored status is unknown.
    pub async fn get(&self, id: ProjectId) -> Result<Option<Project>, DbError> {
        let Some(row) = sqlx::query_as::<_, ProjectRow>(
            r"SELECT id, name, description, location, start_date, end_date, status, created_by, created_at
              FROM projects
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let members: Vec<(Uuid,)> = sqlx::query_as(
            r"SELECT user_id FROM project_members WHERE project_id = $1",
        )
        .bind(id.into_inner())
        .fetch_all(self.pool)
        .await?;

        let members = members.into_iter().map(|(u,)| UserId::from(u)).collect();
        row.into_project(members).map(Some)
    }

    /// Insert a project and its members in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any statement fails; nothing is
    /// written in that case.
    pub async fn insert(&self, project: &Project) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO projects (id, name, description, location, start_date, end_date, status, created_by, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(project.id.into_inner())
        .bind(&project.name)
        .bind(project.description.as_deref())
        .bind(project.location.as_deref())
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(project.status.as_str())
        .bind(project.created_by.into_inner())
        .bind(project.created_at)
        .execute(&mut *tx)
        .await?;

        for member in &project.members {
            sqlx::query(
                r"INSERT INTO project_members (project_id, user_id)
                  VALUES ($1, $2)
                  ON CONFLICT DO NOTHING",
            )
            .bind(project.id.into_inner())
            .bind(member.into_inner())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(project_id = %project.id, members = project.members.len(), "Inserted project");
        Ok(())
    }
}

/// A row from the `projects` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    /// Project UUID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Site name.
    pub location: Option<String>,
    /// First fieldwork day.
    pub start_date: Option<NaiveDate>,
    /// Last fieldwork day.
    pub end_date: Option<NaiveDate>,
    /// Status as stored.
    pub status: String,
    /// Creator.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ProjectRow {
    /// Convert into the domain type with the given member set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] for an unknown status.
    pub fn into_project(self, members: BTreeSet<UserId>) -> Result<Project, DbError> {
        let status: ProjectStatus = self.status.parse().map_err(|e: ParseEnumError| DbError::InvalidColumn {
            column: "projects.status",
            value: e.value,
        })?;
        Ok(Project {
            id: ProjectId::from(self.id),
            name: self.name,
            description: self.description,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date,
            status,
            created_by: UserId::from(self.created_by),
            members,
            created_at: self.created_at,
        })
    }
}
