//! Data layer for the biosurvey backend (`PostgreSQL` + `Dragonfly`).
//!
//! `PostgreSQL` is the system of record for users, projects, the species
//! catalog, observations, and stored indicators. `Dragonfly` holds
//! short-lived background job status.
//!
//! ```text
//! Indicator service / job worker
//!     |
//!     +-- survey data ----> PostgreSQL (PostgresPool)
//!     |     |-- UserStore         (users)
//!     |     |-- ProjectStore      (projects + project_members)
//!     |     |-- SpeciesStore      (species catalog)
//!     |     |-- ObservationStore  (observations)
//!     |     +-- IndicatorStore    (stored indicators)
//!     |
//!     +-- job status -----> Dragonfly (DragonflyPool)
//! ```
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` job status operations
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`user_store`], [`project_store`], [`species_store`],
//!   [`observation_store`], [`indicator_store`] -- per-table operations
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod indicator_store;
pub mod observation_store;
pub mod postgres;
pub mod project_store;
pub mod species_store;
pub mod user_store;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyPool;
pub use error::DbError;
pub use indicator_store::{IndicatorRow, IndicatorStore};
pub use observation_store::{ObservationRow, ObservationStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use project_store::{ProjectRow, ProjectStore};
pub use species_store::{SpeciesRow, SpeciesStore};
pub use user_store::{UserRow, UserStore};
