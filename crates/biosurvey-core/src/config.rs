//! Configuration loading and typed config structures for the biosurvey
//! backend.
//!
//! The canonical configuration lives in `biosurvey-config.yaml` at the
//! project root. Every section and field has a default, so an empty or
//! missing file yields a working development setup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use biosurvey_types::{Interval, Metric};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid value for {var}: {value}")]
    Env {
        /// Environment variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level backend configuration.
///
/// Mirrors the structure of `biosurvey-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BiosurveyConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// `PostgreSQL` connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Dragonfly (Redis-compatible) settings for job status.
    #[serde(default)]
    pub dragonfly: DragonflyConfig,

    /// Background job settings.
    #[serde(default)]
    pub jobs: JobsConfig,

    /// Indicator query defaults.
    #[serde(default)]
    pub indicators: IndicatorsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BiosurveyConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `DATABASE_URL` overrides `database.url`
    /// - `DRAGONFLY_URL` (or `REDIS_URL`) overrides `dragonfly.url`
    /// - `BIOSURVEY_PORT` overrides `server.port`
    /// - `BIOSURVEY_OUTPUT_DIR` overrides `jobs.output_dir`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Env`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    /// Environment overrides apply in both cases.
    ///
    /// # Errors
    ///
    /// Same as [`BiosurveyConfig::from_file`].
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override connection strings and paths with environment variables
    /// when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if `BIOSURVEY_PORT` is not a port number.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("DATABASE_URL") {
            self.database.url = Some(val);
        }
        if let Ok(val) = std::env::var("DRAGONFLY_URL").or_else(|_| std::env::var("REDIS_URL")) {
            self.dragonfly.url = Some(val);
        }
        if let Ok(val) = std::env::var("BIOSURVEY_PORT") {
            self.server.port = val.parse().map_err(|e| ConfigError::Env {
                var: "BIOSURVEY_PORT",
                value: format!("{val} ({e})"),
            })?;
        }
        if let Ok(val) = std::env::var("BIOSURVEY_OUTPUT_DIR") {
            self.jobs.output_dir = PathBuf::from(val);
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `PostgreSQL` connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string. When absent the server runs on the in-memory
    /// store.
    #[serde(default)]
    pub url: Option<String>,

    /// Pool upper bound.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connections kept warm.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Run embedded migrations at startup.
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            run_migrations: true,
        }
    }
}

/// Dragonfly settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DragonflyConfig {
    /// Connection URL. When absent job status is kept in memory.
    #[serde(default)]
    pub url: Option<String>,

    /// Seconds a job status entry survives after its last update. The
    /// in-memory fallback applies it to finished jobs.
    #[serde(default = "default_job_status_ttl_secs")]
    pub job_status_ttl_secs: i64,
}

impl Default for DragonflyConfig {
    fn default() -> Self {
        Self {
            url: None,
            job_status_ttl_secs: default_job_status_ttl_secs(),
        }
    }
}

/// Background job settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobsConfig {
    /// Root directory for generated files; exports and reports go in
    /// `exports/` and `reports/` beneath it.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Generated files older than this many days are removed by cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Bounded queue capacity; submissions beyond it are rejected.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Seconds between scheduled cleanup runs.
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl JobsConfig {
    /// Directory for observation exports.
    pub fn exports_dir(&self) -> PathBuf {
        self.output_dir.join("exports")
    }

    /// Directory for rendered reports.
    pub fn reports_dir(&self) -> PathBuf {
        self.output_dir.join("reports")
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            retention_days: default_retention_days(),
            queue_capacity: default_queue_capacity(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Indicator query defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndicatorsConfig {
    /// Interval used when a request omits one.
    #[serde(default)]
    pub default_interval: Interval,

    /// Metric used when a request omits one.
    #[serde(default)]
    pub default_metric: Metric,

    /// Grid size in degrees used when a request omits one.
    #[serde(default = "default_grid_size")]
    pub default_grid_size: f64,
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        Self {
            default_interval: Interval::default(),
            default_metric: Metric::default(),
            default_grid_size: default_grid_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error). `RUST_LOG` wins
    /// when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (required by serde)
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_owned()
}
const fn default_port() -> u16 {
    8080
}
const fn default_max_connections() -> u32 {
    10
}
const fn default_min_connections() -> u32 {
    1
}
const fn default_acquire_timeout_secs() -> u64 {
    5
}
const fn default_true() -> bool {
    true
}
const fn default_job_status_ttl_secs() -> i64 {
    86_400
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}
const fn default_retention_days() -> u32 {
    7
}
const fn default_queue_capacity() -> usize {
    64
}
const fn default_cleanup_interval_secs() -> u64 {
    3_600
}
const fn default_grid_size() -> f64 {
    0.01
}
fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = BiosurveyConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.jobs.retention_days, 7);
        assert_eq!(config.indicators.default_interval, Interval::Monthly);
        assert_eq!(config.indicators.default_metric, Metric::Count);
        assert!(config.database.run_migrations);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 9000
database:
  max_connections: 20
jobs:
  output_dir: "/var/lib/biosurvey"
  retention_days: 30
indicators:
  default_interval: weekly
  default_metric: abundance
  default_grid_size: 0.05
logging:
  level: debug
  json: true
"#;
        let config = serde_yml::from_str::<BiosurveyConfig>(yaml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.jobs.retention_days, 30);
        assert_eq!(config.jobs.exports_dir(), PathBuf::from("/var/lib/biosurvey/exports"));
        assert_eq!(config.indicators.default_interval, Interval::Weekly);
        assert_eq!(config.indicators.default_metric, Metric::Abundance);
        assert!(config.logging.json);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = BiosurveyConfig::parse("");
        assert!(config.is_ok());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = BiosurveyConfig::load_or_default(Path::new("/nonexistent/biosurvey-config.yaml"));
        assert!(config.is_ok());
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("biosurvey-config.yaml");
        if path.exists() {
            let config = BiosurveyConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
