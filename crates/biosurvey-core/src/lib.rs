//! Service layer for the biosurvey backend.
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`access`] -- explicit capability checks on a [`access::Principal`]
//! - [`validation`] -- typed query/body validation with field errors
//! - [`store`] -- the [`store::SurveyStore`] boundary and an in-memory store
//! - [`service`] -- the indicator service tying the above to the engine

pub mod access;
pub mod config;
pub mod service;
pub mod store;
pub mod validation;

pub use access::{AccessError, Principal};
pub use config::{BiosurveyConfig, ConfigError};
pub use service::{IndicatorService, ServiceError, SpatialGrid};
pub use store::{InMemoryStore, StoreError, SurveyStore};
pub use validation::ValidationFailure;
