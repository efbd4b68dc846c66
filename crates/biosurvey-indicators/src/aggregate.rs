//! Grouping of observation records by species and by calendar bucket.
//!
//! Buckets are keyed internally by their start date so that ordering is
//! chronological; the string key is produced only at the output boundary.
//!
//! | Interval | Bucket start | Key format |
//! |----------|--------------|------------|
//! | daily | the day itself | `YYYY-MM-DD` |
//! | weekly | Monday of the week | `YYYY-MM-DD` |
//! | monthly | first of the month | `YYYY-MM` |
//! | yearly | 1 January | `YYYY` |

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use biosurvey_types::{Interval, Metric, ObservationRecord, SpeciesId};

/// Summed individual count per species.
pub fn aggregate_by_species(records: &[ObservationRecord]) -> BTreeMap<SpeciesId, u64> {
    let mut totals: BTreeMap<SpeciesId, u64> = BTreeMap::new();
    for record in records {
        let entry = totals.entry(record.species_id).or_insert(0);
        *entry = entry.saturating_add(u64::from(record.count));
    }
    totals
}

/// Abundance and record count for one species.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpeciesAbundance {
    /// The species.
    pub species_id: SpeciesId,
    /// Total individuals observed.
    pub abundance: u64,
    /// Number of observation records.
    pub observations: u64,
}

/// Per-species abundance, most abundant first. Ties are broken by record
/// count, then by species id.
pub fn species_abundances(records: &[ObservationRecord]) -> Vec<SpeciesAbundance> {
    let mut by_species: BTreeMap<SpeciesId, (u64, u64)> = BTreeMap::new();
    for record in records {
        let (abundance, observations) = by_species.entry(record.species_id).or_insert((0, 0));
        *abundance = abundance.saturating_add(u64::from(record.count));
        *observations = observations.saturating_add(1);
    }

    let mut list: Vec<SpeciesAbundance> = by_species
        .into_iter()
        .map(|(species_id, (abundance, observations))| SpeciesAbundance {
            species_id,
            abundance,
            observations,
        })
        .collect();
    list.sort_by(|a, b| {
        b.abundance
            .cmp(&a.abundance)
            .then(b.observations.cmp(&a.observations))
            .then(a.species_id.cmp(&b.species_id))
    });
    list
}

/// One time bucket and its accumulated value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimeSeriesPoint {
    /// Bucket key, formatted per interval.
    pub bucket_key: String,
    /// Record count or individual sum, per metric.
    pub value: u64,
}

/// Start date of the bucket containing `day`.
pub fn bucket_start(day: NaiveDate, interval: Interval) -> NaiveDate {
    match interval {
        Interval::Daily => day,
        Interval::Weekly => {
            let offset = u64::from(day.weekday().num_days_from_monday());
            day.checked_sub_days(Days::new(offset)).unwrap_or(day)
        }
        Interval::Monthly => day.with_day(1).unwrap_or(day),
        Interval::Yearly => day.with_ordinal(1).unwrap_or(day),
    }
}

/// Render a bucket start date as its key.
pub fn bucket_key(start: NaiveDate, interval: Interval) -> String {
    match interval {
        Interval::Daily | Interval::Weekly => start.format("%Y-%m-%d").to_string(),
        Interval::Monthly => start.format("%Y-%m").to_string(),
        Interval::Yearly => start.format("%Y").to_string(),
    }
}

/// Accumulate `metric` into buckets keyed by start date.
pub(crate) fn bucket_totals(
    records: &[ObservationRecord],
    interval: Interval,
    metric: Metric,
) -> BTreeMap<NaiveDate, u64> {
    let mut buckets: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in records {
        let start = bucket_start(record.timestamp.date_naive(), interval);
        let increment = match metric {
            Metric::Count => 1,
            Metric::Abundance => u64::from(record.count),
        };
        let entry = buckets.entry(start).or_insert(0);
        *entry = entry.saturating_add(increment);
    }
    buckets
}

/// Group records into calendar buckets, ascending by bucket start.
///
/// Only buckets containing at least one record are returned.
pub fn aggregate_by_time(
    records: &[ObservationRecord],
    interval: Interval,
    metric: Metric,
) -> Vec<TimeSeriesPoint> {
    bucket_totals(records, interval, metric)
        .into_iter()
        .map(|(start, value)| TimeSeriesPoint {
            bucket_key: bucket_key(start, interval),
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(species_id: SpeciesId, count: u32, y: i32, m: u32, d: u32) -> ObservationRecord {
        ObservationRecord {
            species_id,
            count,
            timestamp: Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    #[test]
    fn species_totals_sum_counts() {
        let a = SpeciesId::new();
        let b = SpeciesId::new();
        let records = vec![at(a, 2, 2024, 1, 1), at(b, 4, 2024, 1, 1), at(a, 3, 2024, 1, 2)];
        let totals = aggregate_by_species(&records);
        assert_eq!(totals.get(&a), Some(&5));
        assert_eq!(totals.get(&b), Some(&4));
    }

    #[test]
    fn abundance_list_is_sorted_descending() {
        let a = SpeciesId::new();
        let b = SpeciesId::new();
        let records = vec![at(a, 1, 2024, 1, 1), at(b, 7, 2024, 1, 1), at(a, 1, 2024, 1, 2)];
        let list = species_abundances(&records);
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].species_id, b);
        assert_eq!(list[0].abundance, 7);
        assert_eq!(list[1].observations, 2);
    }

    #[test]
    fn weekly_bucket_starts_on_monday() {
        // 2024-03-07 is a Thursday.
        let thursday = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_eq!(bucket_start(thursday, Interval::Weekly), monday);
        assert_eq!(bucket_start(monday, Interval::Weekly), monday);
    }

    #[test]
    fn weekly_bucket_can_start_in_previous_year() {
        // 2025-01-01 is a Wednesday; its week began 2024-12-30.
        let day = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(bucket_key(bucket_start(day, Interval::Weekly), Interval::Weekly), "2024-12-30");
    }

    #[test]
    fn keys_follow_interval_format() {
        let day = NaiveDate::from_ymd_opt(2024, 7, 19).unwrap();
        assert_eq!(bucket_key(bucket_start(day, Interval::Daily), Interval::Daily), "2024-07-19");
        assert_eq!(bucket_key(bucket_start(day, Interval::Monthly), Interval::Monthly), "2024-07");
        assert_eq!(bucket_key(bucket_start(day, Interval::Yearly), Interval::Yearly), "2024");
    }

    #[test]
    fn monthly_buckets_are_chronological_across_years() {
        let a = SpeciesId::new();
        let records = vec![
            at(a, 1, 2024, 2, 10),
            at(a, 1, 2023, 11, 3),
            at(a, 3, 2024, 2, 28),
        ];
        let points = aggregate_by_time(&records, Interval::Monthly, Metric::Abundance);
        let keys: Vec<&str> = points.iter().map(|p| p.bucket_key.as_str()).collect();
        assert_eq!(keys, vec!["2023-11", "2024-02"]);
        assert_eq!(points[1].value, 4);
    }

    #[test]
    fn count_metric_counts_records_not_individuals() {
        let a = SpeciesId::new();
        let records = vec![at(a, 10, 2024, 5, 1), at(a, 20, 2024, 5, 1)];
        let points = aggregate_by_time(&records, Interval::Daily, Metric::Count);
        assert_eq!(points, vec![TimeSeriesPoint {
            bucket_key: String::from("2024-05-01"),
            value: 2,
        }]);
    }
}
