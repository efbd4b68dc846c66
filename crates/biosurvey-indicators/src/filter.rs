//! Record selection applied before any indicator is computed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use biosurvey_types::{ObservationRecord, SpeciesId};

/// Optional restrictions on which records feed an indicator.
///
/// Date bounds are inclusive and compare against the UTC calendar date of
/// the observation timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationFilter {
    /// Keep only records of this species.
    pub species_id: Option<SpeciesId>,
    /// Keep only records on or after this date.
    pub start: Option<NaiveDate>,
    /// Keep only records on or before this date.
    pub end: Option<NaiveDate>,
}

impl ObservationFilter {
    /// A filter that keeps every record.
    pub const fn all() -> Self {
        Self {
            species_id: None,
            start: None,
            end: None,
        }
    }

    /// Whether `record` passes every configured restriction.
    pub fn matches(&self, record: &ObservationRecord) -> bool {
        if let Some(species) = self.species_id
            && record.species_id != species
        {
            return false;
        }
        let day = record.timestamp.date_naive();
        if let Some(start) = self.start
            && day < start
        {
            return false;
        }
        if let Some(end) = self.end
            && day > end
        {
            return false;
        }
        true
    }

    /// Copy the matching records out of `records`, preserving order.
    pub fn apply(&self, records: &[ObservationRecord]) -> Vec<ObservationRecord> {
        records.iter().filter(|r| self.matches(r)).copied().collect()
    }
}
