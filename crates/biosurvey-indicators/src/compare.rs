//! Year-over-year comparison of diversity indices.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use biosurvey_types::ObservationRecord;

use crate::diversity::{DiversityIndices, compute_diversity};

/// Indices for one calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PeriodIndices {
    /// Calendar year (UTC).
    pub year: i32,
    /// Number of records in the year.
    pub observations: u64,
    /// Diversity of the year's records.
    pub indices: DiversityIndices,
}

/// Signed change from the baseline period to the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DiversityDelta {
    /// Change in species richness.
    pub species_richness: i64,
    /// Change in Shannon index.
    pub shannon_index: f64,
    /// Change in Simpson index.
    pub simpson_index: f64,
    /// Change in evenness.
    pub evenness: f64,
    /// Change in total individuals.
    pub total_individuals: i64,
}

/// A baseline/current pair with deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PeriodComparison {
    /// The earlier reference period.
    pub baseline: PeriodIndices,
    /// The period being compared against the baseline.
    pub current: PeriodIndices,
    /// `current - baseline` for each index.
    pub change: DiversityDelta,
}

fn signed_diff(current: u64, baseline: u64) -> i64 {
    let c = i128::from(current);
    let b = i128::from(baseline);
    i64::try_from(c.saturating_sub(b)).unwrap_or(if c >= b { i64::MAX } else { i64::MIN })
}

fn period(records: &[ObservationRecord], year: i32) -> PeriodIndices {
    let in_year: Vec<ObservationRecord> = records
        .iter()
        .filter(|r| r.timestamp.year() == year)
        .copied()
        .collect();
    PeriodIndices {
        year,
        observations: u64::try_from(in_year.len()).unwrap_or(u64::MAX),
        indices: compute_diversity(&in_year),
    }
}

/// Compare diversity between `baseline_year` and `current_year`.
pub fn compare_periods(records: &[ObservationRecord], baseline_year: i32, current_year: i32) -> PeriodComparison {
    let baseline = period(records, baseline_year);
    let current = period(records, current_year);
    let (b, c) = (baseline.indices, current.indices);
    PeriodComparison {
        baseline,
        current,
        change: DiversityDelta {
            species_richness: signed_diff(c.species_richness, b.species_richness),
            shannon_index: c.shannon_index - b.shannon_index,
            simpson_index: c.simpson_index - b.simpson_index,
            evenness: c.evenness - b.evenness,
            total_individuals: signed_diff(c.total_individuals, b.total_individuals),
        },
    }
}
