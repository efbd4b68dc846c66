//! Core entity structs for the biosurvey backend.
//!
//! These mirror the persisted tables (`users`, `species`, `projects`,
//! `observations`, `indicators`) plus the lightweight [`ObservationRecord`]
//! projection consumed by the indicator engine.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ConservationStatus, IndicatorMetricType, ProjectStatus, Role};
use crate::ids::{IndicatorId, ObservationId, ProjectId, SpeciesId, UserId};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A registered user. Credentials live with the authentication gateway and
/// are never part of this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Login name, unique.
    pub username: String,
    /// Contact email, unique.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Access role.
    pub role: Role,
    /// Inactive users are refused by every capability check.
    pub is_active: bool,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// `"First Last"`, as shown in exports and reports.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ---------------------------------------------------------------------------
// Species catalog
// ---------------------------------------------------------------------------

/// A species in the shared catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Species {
    /// Unique species identifier.
    pub id: SpeciesId,
    /// Binomial name, unique.
    pub scientific_name: String,
    /// Vernacular name.
    pub common_name: String,
    /// Taxonomic family.
    pub family: Option<String>,
    /// Taxonomic genus.
    pub genus: Option<String>,
    /// Short field code (2 to 10 uppercase letters).
    pub species_code: Option<String>,
    /// IUCN Red List category, when assessed.
    pub conservation_status: Option<ConservationStatus>,
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// A monitoring project that groups observations and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Project {
    /// Unique project identifier.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Human-readable site name.
    pub location: Option<String>,
    /// First day of fieldwork.
    pub start_date: Option<NaiveDate>,
    /// Last day of fieldwork.
    pub end_date: Option<NaiveDate>,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// The user who created the project.
    pub created_by: UserId,
    /// Users allowed to read and contribute, creator included.
    pub members: BTreeSet<UserId>,
    /// When the project was created.
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Whether `user` created or belongs to this project.
    pub fn has_member(&self, user: UserId) -> bool {
        self.created_by == user || self.members.contains(&user)
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// A single field observation as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Observation {
    /// Unique observation identifier.
    pub id: ObservationId,
    /// Project the observation was logged under.
    pub project_id: ProjectId,
    /// Observed species.
    pub species_id: SpeciesId,
    /// User who logged the observation.
    pub observer_id: UserId,
    /// When the individuals were seen.
    pub observed_at: DateTime<Utc>,
    /// WGS84 latitude in degrees, within `[-90, 90]`.
    pub latitude: f64,
    /// WGS84 longitude in degrees, within `[-180, 180]`.
    pub longitude: f64,
    /// Human-readable place name.
    pub location_name: Option<String>,
    /// Number of individuals, at least 1.
    pub count: u32,
    /// Observed behavior.
    pub behavior: Option<String>,
    /// Habitat notes.
    pub habitat_description: Option<String>,
    /// Weather at the time of observation.
    pub weather_conditions: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// GPS accuracy in meters.
    pub accuracy: Option<f64>,
    /// Altitude in meters.
    pub altitude: Option<f64>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl Observation {
    /// Project this observation onto the fields the indicator engine reads.
    pub const fn record(&self) -> ObservationRecord {
        ObservationRecord {
            species_id: self.species_id,
            count: self.count,
            timestamp: self.observed_at,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// The read-only view of an observation consumed by the indicator engine.
///
/// Invariants (enforced upstream, assumed by the engine): `count >= 1`,
/// `latitude` in `[-90, 90]`, `longitude` in `[-180, 180]`, both finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ObservationRecord {
    /// Observed species.
    pub species_id: SpeciesId,
    /// Number of individuals.
    pub count: u32,
    /// When the individuals were seen.
    pub timestamp: DateTime<Utc>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Stored indicators
// ---------------------------------------------------------------------------

/// A named indicator value stored against a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Indicator {
    /// Unique indicator identifier.
    pub id: IndicatorId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Display name, e.g. `"Shannon index"`.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Kind of value.
    pub metric_type: IndicatorMetricType,
    /// The value, if computed.
    pub value: Option<f64>,
    /// Unit label, e.g. `"nats"` or `"species"`.
    pub unit: Option<String>,
    /// When the value was calculated.
    pub calculation_date: DateTime<Utc>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project(creator: UserId) -> Project {
        Project {
            id: ProjectId::new(),
            name: String::from("Wetland transects"),
            description: None,
            location: None,
            start_date: None,
            end_date: None,
            status: ProjectStatus::Active,
            created_by: creator,
            members: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn creator_counts_as_member() {
        let creator = UserId::new();
        let project = sample_project(creator);
        assert!(project.has_member(creator));
        assert!(!project.has_member(UserId::new()));
    }

    #[test]
    fn listed_member_has_access() {
        let member = UserId::new();
        let mut project = sample_project(UserId::new());
        project.members.insert(member);
        assert!(project.has_member(member));
    }

    #[test]
    fn record_projection_keeps_engine_fields() {
        let species_id = SpeciesId::new();
        let observed_at = Utc::now();
        let observation = Observation {
            id: ObservationId::new(),
            project_id: ProjectId::new(),
            species_id,
            observer_id: UserId::new(),
            observed_at,
            latitude: -1.2921,
            longitude: 36.8219,
            location_name: None,
            count: 5,
            behavior: None,
            habitat_description: None,
            weather_conditions: None,
            notes: None,
            accuracy: None,
            altitude: None,
            created_at: observed_at,
        };
        let record = observation.record();
        assert_eq!(record.species_id, species_id);
        assert_eq!(record.count, 5);
        assert_eq!(record.timestamp, observed_at);
    }
}
