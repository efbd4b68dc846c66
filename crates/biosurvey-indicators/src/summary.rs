//! Project-level statistics used by the summary endpoint and HTML reports.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use biosurvey_types::{ConservationStatus, Observation, ObservationRecord, Species, SpeciesId, UserId};

use crate::aggregate::species_abundances;
use crate::diversity::{DiversityIndices, compute_diversity};
use crate::geo::{BoundingBox, GeoPoint};

/// Key used in [`ProjectSummary::conservation_counts`] for species without
/// an assessed IUCN category.
pub const UNKNOWN_STATUS: &str = "unknown";

/// One row of the per-species breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpeciesBreakdown {
    /// The species.
    pub species_id: SpeciesId,
    /// Binomial name, or the id when the species is missing from the catalog.
    pub scientific_name: String,
    /// Vernacular name, empty when unknown.
    pub common_name: String,
    /// IUCN category, if assessed.
    pub conservation_status: Option<ConservationStatus>,
    /// Total individuals.
    pub total_count: u64,
    /// Number of observation records.
    pub observation_count: u64,
}

/// Spatial footprint of the project's observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeographicExtent {
    /// Bounding box of all observation coordinates.
    pub bounds: BoundingBox,
    /// Great-circle length of the box diagonal, in kilometers.
    pub diagonal_km: f64,
}

/// Aggregate statistics for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProjectSummary {
    /// Number of observation records.
    pub total_observations: u64,
    /// Number of distinct species observed.
    pub unique_species: u64,
    /// Sum of individual counts.
    pub total_individuals: u64,
    /// Number of distinct observers.
    pub unique_observers: u64,
    /// Date of the earliest observation (UTC).
    pub first_observation: Option<NaiveDate>,
    /// Date of the latest observation (UTC).
    pub last_observation: Option<NaiveDate>,
    /// Per-species totals, most abundant first.
    pub species_breakdown: Vec<SpeciesBreakdown>,
    /// Observed species per IUCN code, plus [`UNKNOWN_STATUS`].
    pub conservation_counts: BTreeMap<String, u64>,
    /// Spatial footprint, absent when there are no observations.
    pub extent: Option<GeographicExtent>,
    /// Diversity indices over all observations.
    pub diversity: DiversityIndices,
}

fn len_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Summarize `observations`, resolving species names from `catalog`.
pub fn summarize_project(observations: &[Observation], catalog: &[Species]) -> ProjectSummary {
    let records: Vec<ObservationRecord> = observations.iter().map(Observation::record).collect();
    let by_id: BTreeMap<SpeciesId, &Species> = catalog.iter().map(|s| (s.id, s)).collect();

    let species_breakdown: Vec<SpeciesBreakdown> = species_abundances(&records)
        .into_iter()
        .map(|row| {
            let species = by_id.get(&row.species_id);
            SpeciesBreakdown {
                species_id: row.species_id,
                scientific_name: species.map_or_else(|| row.species_id.to_string(), |s| s.scientific_name.clone()),
                common_name: species.map(|s| s.common_name.clone()).unwrap_or_default(),
                conservation_status: species.and_then(|s| s.conservation_status),
                total_count: row.abundance,
                observation_count: row.observations,
            }
        })
        .collect();

    let mut conservation_counts: BTreeMap<String, u64> = BTreeMap::new();
    for row in &species_breakdown {
        let key = row
            .conservation_status
            .map_or_else(|| UNKNOWN_STATUS.to_owned(), |s| s.code().to_owned());
        let entry = conservation_counts.entry(key).or_insert(0);
        *entry = entry.saturating_add(1);
    }

    let observers: BTreeSet<UserId> = observations.iter().map(|o| o.observer_id).collect();
    let first_observation = observations.iter().map(|o| o.observed_at.date_naive()).min();
    let last_observation = observations.iter().map(|o| o.observed_at.date_naive()).max();

    let extent = BoundingBox::from_points(
        observations
            .iter()
            .map(|o| GeoPoint::new(o.latitude, o.longitude)),
    )
    .map(|bounds| GeographicExtent {
        bounds,
        diagonal_km: bounds.diagonal_km(),
    });

    let diversity = compute_diversity(&records);

    ProjectSummary {
        total_observations: len_u64(observations.len()),
        unique_species: len_u64(species_breakdown.len()),
        total_individuals: diversity.total_individuals,
        unique_observers: len_u64(observers.len()),
        first_observation,
        last_observation,
        species_breakdown,
        conservation_counts,
        extent,
        diversity,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use biosurvey_types::{ObservationId, ProjectId};

    use super::*;

    fn species(name: &str, status: Option<ConservationStatus>) -> Species {
        Species {
            id: SpeciesId::new(),
            scientific_name: name.to_owned(),
            common_name: format!("common {name}"),
            family: None,
            genus: None,
            species_code: None,
            conservation_status: status,
        }
    }

    fn observation(species_id: SpeciesId, observer_id: UserId, count: u32, day: u32, lat: f64, lon: f64) -> Observation {
        let observed_at = Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).unwrap();
        Observation {
            id: ObservationId::new(),
            project_id: ProjectId::new(),
            species_id,
            observer_id,
            observed_at,
            latitude: lat,
            longitude: lon,
            location_name: None,
            count,
            behavior: None,
            habitat_description: None,
            weather_conditions: None,
            notes: None,
            accuracy: None,
            altitude: None,
            created_at: observed_at,
        }
    }

    #[test]
    fn empty_project_summary() {
        let summary = summarize_project(&[], &[]);
        assert_eq!(summary.total_observations, 0);
        assert!(summary.extent.is_none());
        assert!(summary.first_observation.is_none());
        assert!(summary.conservation_counts.is_empty());
        assert_eq!(summary.diversity, DiversityIndices::default());
    }

    #[test]
    fn summary_counts_and_breakdown() {
        let lion = species("Panthera leo", Some(ConservationStatus::Vulnerable));
        let zebra = species("Equus quagga", Some(ConservationStatus::NearThreatened));
        let mystery = species("Incertae sedis", None);
        let (alice, bob) = (UserId::new(), UserId::new());

        let observations = vec![
            observation(lion.id, alice, 2, 3, -1.0, 36.0),
            observation(zebra.id, alice, 12, 1, -1.5, 36.5),
            observation(zebra.id, bob, 8, 9, -1.2, 36.2),
            observation(mystery.id, bob, 1, 5, -1.1, 36.1),
        ];
        let summary = summarize_project(&observations, &[lion.clone(), zebra.clone(), mystery]);

        assert_eq!(summary.total_observations, 4);
        assert_eq!(summary.unique_species, 3);
        assert_eq!(summary.total_individuals, 23);
        assert_eq!(summary.unique_observers, 2);
        assert_eq!(summary.first_observation, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(summary.last_observation, NaiveDate::from_ymd_opt(2024, 5, 9));

        let top = &summary.species_breakdown[0];
        assert_eq!(top.species_id, zebra.id);
        assert_eq!(top.total_count, 20);
        assert_eq!(top.observation_count, 2);
        assert_eq!(top.common_name, "common Equus quagga");

        assert_eq!(summary.conservation_counts.get("VU"), Some(&1));
        assert_eq!(summary.conservation_counts.get("NT"), Some(&1));
        assert_eq!(summary.conservation_counts.get(UNKNOWN_STATUS), Some(&1));

        let extent = summary.extent.unwrap();
        assert!((extent.bounds.min_latitude + 1.5).abs() < f64::EPSILON);
        assert!(extent.diagonal_km > 0.0);
        assert_eq!(summary.diversity.species_richness, 3);
    }

    #[test]
    fn species_missing_from_catalog_uses_id() {
        let orphan = SpeciesId::new();
        let summary = summarize_project(&[observation(orphan, UserId::new(), 1, 2, 0.0, 0.0)], &[]);
        assert_eq!(summary.species_breakdown[0].scientific_name, orphan.to_string());
        assert_eq!(summary.conservation_counts.get(UNKNOWN_STATUS), Some(&1));
    }
}
