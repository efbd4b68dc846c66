//! Shared type definitions for the biosurvey field-data backend.
//!
//! This crate is the single source of truth for entity types used across
//! the workspace. Types flow downstream to `TypeScript` via `ts-rs` for the
//! web dashboard.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Roles, statuses, intervals, metrics, export formats
//! - [`structs`] -- Users, species, projects, observations, indicators

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{
    ConservationStatus, ExportFormat, IndicatorMetricType, Interval, Metric, ParseEnumError,
    ProjectStatus, Role,
};
pub use ids::{IndicatorId, JobId, ObservationId, ProjectId, SpeciesId, UserId};
pub use structs::{Indicator, Observation, ObservationRecord, Project, Species, User};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes bindings for every #[ts(export)] type into the
        // `bindings/` directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::UserId::export_all();
        let _ = crate::ids::ProjectId::export_all();
        let _ = crate::ids::SpeciesId::export_all();
        let _ = crate::ids::ObservationId::export_all();
        let _ = crate::ids::IndicatorId::export_all();
        let _ = crate::ids::JobId::export_all();

        // Enums
        let _ = crate::enums::Role::export_all();
        let _ = crate::enums::ProjectStatus::export_all();
        let _ = crate::enums::ConservationStatus::export_all();
        let _ = crate::enums::IndicatorMetricType::export_all();
        let _ = crate::enums::Interval::export_all();
        let _ = crate::enums::Metric::export_all();
        let _ = crate::enums::ExportFormat::export_all();

        // Structs
        let _ = crate::structs::User::export_all();
        let _ = crate::structs::Species::export_all();
        let _ = crate::structs::Project::export_all();
        let _ = crate::structs::Observation::export_all();
        let _ = crate::structs::ObservationRecord::export_all();
        let _ = crate::structs::Indicator::export_all();
    }
}
