//! Alpha-diversity indices over a species abundance table.
//!
//! All functions accept the output of
//! [`aggregate_by_species`](crate::aggregate::aggregate_by_species) and
//! return `0.0` for degenerate input instead of failing:
//!
//! - **Richness** `S`: distinct species with abundance > 0
//! - **Shannon** `H = -sum(p_i * ln p_i)`: 0 when total individuals <= 1
//! - **Simpson** `D = 1 - sum(p_i^2)`: 0 when total individuals <= 1
//! - **Pielou evenness** `J = H / ln S`: 0 when `S <= 1`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use biosurvey_types::{ObservationRecord, SpeciesId};

use crate::aggregate::aggregate_by_species;

/// The full set of diversity indices for one record set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DiversityIndices {
    /// Number of distinct species present.
    pub species_richness: u64,
    /// Shannon-Wiener index in nats.
    pub shannon_index: f64,
    /// Gini-Simpson index.
    pub simpson_index: f64,
    /// Pielou evenness.
    pub evenness: f64,
    /// Sum of individual counts.
    pub total_individuals: u64,
}

/// Number of species with non-zero abundance.
pub fn species_richness(abundance: &BTreeMap<SpeciesId, u64>) -> u64 {
    let present = abundance.values().filter(|&&n| n > 0).count();
    u64::try_from(present).unwrap_or(u64::MAX)
}

fn total_individuals(abundance: &BTreeMap<SpeciesId, u64>) -> u64 {
    abundance.values().fold(0u64, |acc, &n| acc.saturating_add(n))
}

/// Relative abundances `p_i` of the species present.
#[allow(clippy::cast_precision_loss)]
fn proportions(abundance: &BTreeMap<SpeciesId, u64>, total: u64) -> impl Iterator<Item = f64> + '_ {
    let total_f = total as f64;
    abundance
        .values()
        .filter(|&&n| n > 0)
        .map(move |&n| n as f64 / total_f)
}

/// Shannon-Wiener index `H` (natural log).
pub fn shannon_index(abundance: &BTreeMap<SpeciesId, u64>) -> f64 {
    let total = total_individuals(abundance);
    if total <= 1 {
        return 0.0;
    }
    let sum: f64 = proportions(abundance, total).map(|p| p * p.ln()).sum();
    // A single species sums to 0.0 and would negate to -0.0.
    let h = -sum;
    if h > 0.0 { h } else { 0.0 }
}

/// Gini-Simpson index `1 - sum(p_i^2)`.
pub fn simpson_index(abundance: &BTreeMap<SpeciesId, u64>) -> f64 {
    let total = total_individuals(abundance);
    if total <= 1 {
        return 0.0;
    }
    let dominance: f64 = proportions(abundance, total).map(|p| p * p).sum();
    (1.0 - dominance).max(0.0)
}

/// Pielou evenness `H / ln(S)`.
#[allow(clippy::cast_precision_loss)]
pub fn evenness(shannon: f64, richness: u64) -> f64 {
    if richness <= 1 {
        return 0.0;
    }
    let max_h = (richness as f64).ln();
    (shannon / max_h).clamp(0.0, 1.0)
}

/// Compute every index from raw records.
pub fn compute_diversity(records: &[ObservationRecord]) -> DiversityIndices {
    let abundance = aggregate_by_species(records);
    let species_richness = species_richness(&abundance);
    let shannon = shannon_index(&abundance);
    DiversityIndices {
        species_richness,
        shannon_index: shannon,
        simpson_index: simpson_index(&abundance),
        evenness: evenness(shannon, species_richness),
        total_individuals: total_individuals(&abundance),
    }
}
