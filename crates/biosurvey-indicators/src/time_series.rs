//! Column-oriented time series for charting.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use biosurvey_types::{Interval, Metric, ObservationRecord};

use crate::aggregate::{bucket_key, bucket_totals};

/// Parallel `dates`/`values` columns, ascending by bucket start.
///
/// `dates[i]` is the bucket key for `values[i]`; both vectors always have
/// the same length and empty buckets are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TimeSeries {
    /// Bucket keys.
    pub dates: Vec<String>,
    /// Bucket values.
    pub values: Vec<u64>,
    /// Interval the series was bucketed by.
    pub interval: Interval,
    /// What each value accumulates.
    pub metric: Metric,
}

impl TimeSeries {
    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the series has no buckets.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Build a time series of `metric` bucketed by `interval`.
pub fn build_time_series(records: &[ObservationRecord], metric: Metric, interval: Interval) -> TimeSeries {
    let buckets = bucket_totals(records, interval, metric);
    let mut dates = Vec::with_capacity(buckets.len());
    let mut values = Vec::with_capacity(buckets.len());
    for (start, value) in buckets {
        dates.push(bucket_key(start, interval));
        values.push(value);
    }
    TimeSeries {
        dates,
        values,
        interval,
        metric,
    }
}
