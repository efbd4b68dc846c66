//! Tracing subscriber setup.

use biosurvey_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
///
/// # Errors
///
/// Returns [`ServerError::Logging`] if the configured level is not a valid
/// filter directive or a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), ServerError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| ServerError::Logging {
            message: format!("invalid log level {:?}: {e}", config.level),
        })?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ServerError::Logging {
        message: e.to_string(),
    })
}
