//! Error types for the server binary.

use biosurvey_core::ConfigError;
use biosurvey_db::DbError;

/// Errors that abort server startup or shutdown.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration could not be loaded.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A storage backend could not be reached or migrated.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying database error.
        #[from]
        source: DbError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("http server error: {source}")]
    Http {
        /// The underlying server error.
        #[from]
        source: biosurvey_api::ServerError,
    },

    /// The logging subscriber could not be configured.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },
}
