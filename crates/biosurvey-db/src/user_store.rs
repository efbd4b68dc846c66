//! Operations on the `users` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use biosurvey_types::{ParseEnumError, Role, User, UserId};

use crate::error::DbError;

/// Operations on the `users` table.
pub struct UserStore<'a> {
    pool: &'a PgPool,
}

impl<'a> UserStore<'a> {
    /// Create a new user store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::InvalidColumn`] if the stored role is unknown.
    pub async fn get(&self, id: UserId) -> Result<Option<User>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, email, first_name, last_name, role, is_active, created_at
              FROM users
              WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Load several users at once; unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query or a row conversion fails.
    pub async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, DbError> {
        let raw: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
        let rows = sqlx::query_as::<_, UserRow>(
            r"SELECT id, username, email, first_name, last_name, role, is_active, created_at
              FROM users
              WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails (for example on a
    /// duplicate username or email).
    pub async fn insert(&self, user: &User) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO users (id, username, email, first_name, last_name, role, is_active, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(user.id.into_inner())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(self.pool)
        .await?;

        tracing::debug!(user_id = %user.id, username = %user.username, "Inserted user");
        Ok(())
    }
}

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// User UUID.
    pub id: Uuid,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Role as stored (`admin`, `researcher`, `observer`).
    pub role: String,
    /// Whether the account is enabled.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(|e: ParseEnumError| DbError::InvalidColumn {
            column: "users.role",
            value: e.value,
        })?;
        Ok(Self {
            id: UserId::from(row.id),
            username: row.username,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> UserRow {
        UserRow {
            id: Uuid::now_v7(),
            username: "jdoe".to_owned(),
            email: "jdoe@example.org".to_owned(),
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            role: role.to_owned(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_user() {
        let user = User::try_from(row("researcher")).unwrap();
        assert_eq!(user.role, Role::Researcher);
        assert_eq!(user.full_name(), "Jane Doe");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = User::try_from(row("curator")).unwrap_err();
        assert!(matches!(err, DbError::InvalidColumn { column: "users.role", .. }));
    }
}
