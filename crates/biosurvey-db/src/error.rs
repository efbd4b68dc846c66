//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] and [`fred`] errors with additional context about which
//! operation failed.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored text column held a value outside its enumeration.
    #[error("invalid value {value:?} in column {column}")]
    InvalidColumn {
        /// Column name, e.g. `users.role`.
        column: &'static str,
        /// The stored value.
        value: String,
    },

    /// A stored integer did not fit the domain type.
    #[error("out-of-range value {value} in column {column}")]
    OutOfRange {
        /// Column name.
        column: &'static str,
        /// The stored value.
        value: i64,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether the database rejected a write for referencing a missing row.
    pub fn is_foreign_key_violation(&self) -> bool {
        match self {
            Self::Postgres(sqlx::Error::Database(db)) => db.is_foreign_key_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_fk_violations() {
        assert!(!DbError::Config("bad url".to_owned()).is_foreign_key_violation());
        assert!(!DbError::Postgres(sqlx::Error::RowNotFound).is_foreign_key_violation());
    }
}
