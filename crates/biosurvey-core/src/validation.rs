//! Typed request validation.
//!
//! Query strings and JSON bodies are deserialized into the `*Params` /
//! `*Body` structs below, then converted into validated request values.
//! Field-level rules use the `validator` derive; cross-field rules and
//! string-to-type parsing are checked by hand. Every failure is collected
//! into a [`ValidationFailure`] keyed by field name, so a client sees all
//! problems at once.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use biosurvey_indicators::ObservationFilter;
use biosurvey_types::{ExportFormat, IndicatorMetricType, Interval, Metric, SpeciesId};

use crate::config::IndicatorsConfig;

/// Structured field errors: field name to human-readable messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("validation failed for {} field(s)", .fields.len())]
pub struct ValidationFailure {
    /// Messages per offending field.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationFailure {
    /// Record a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_owned()).or_default().push(message.into());
    }

    /// Whether no errors were recorded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `Ok(value)` if nothing was recorded, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Merge the derive-level errors reported by `validator`.
    pub fn absorb(&mut self, errors: &ValidationErrors) {
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let message = err
                    .message
                    .as_ref()
                    .map_or_else(|| format!("invalid value ({})", err.code), ToString::to_string);
                self.add(&field.to_string(), message);
            }
        }
    }

    /// Run the derive-level rules of `value` and collect their errors.
    pub fn from_validate<V: Validate>(value: &V) -> Self {
        let mut failure = Self::default();
        if let Err(errors) = value.validate() {
            failure.absorb(&errors);
        }
        failure
    }
}

fn parse_species(raw: Option<&str>, failure: &mut ValidationFailure) -> Option<SpeciesId> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse::<SpeciesId>() {
        Ok(id) => Some(id),
        Err(_) => {
            failure.add("species_id", "must be a UUID");
            None
        }
    }
}

fn parse_date(field: &str, raw: Option<&str>, failure: &mut ValidationFailure) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    failure.add(field, "must be a date (YYYY-MM-DD) or RFC 3339 timestamp");
    None
}

// ---------------------------------------------------------------------------
// Indicator queries
// ---------------------------------------------------------------------------

/// Smallest accepted spatial cell, in degrees (about 11 cm at the equator).
pub const MIN_GRID_SIZE: f64 = 1e-6;

/// Largest accepted spatial cell, in degrees.
pub const MAX_GRID_SIZE: f64 = 10.0;

/// Raw query parameters accepted by the indicator endpoints.
///
/// Each endpoint reads only the parameters it needs. Omitted `interval` and
/// `metric` use the configured defaults; unknown values fall back to
/// monthly and count rather than failing.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct IndicatorParams {
    /// Restrict to one species (UUID).
    pub species_id: Option<String>,
    /// Inclusive lower date bound.
    pub start_date: Option<String>,
    /// Inclusive upper date bound.
    pub end_date: Option<String>,
    /// Time bucket width.
    pub interval: Option<String>,
    /// `count` or `abundance`.
    pub metric: Option<String>,
    /// Spatial cell size in degrees.
    #[validate(range(
        min = MIN_GRID_SIZE,
        max = MAX_GRID_SIZE,
        message = "must be between 0.000001 and 10 degrees"
    ))]
    pub grid_size: Option<f64>,
    /// Baseline year for period comparison.
    #[validate(range(min = 1900, max = 2200, message = "must be a year between 1900 and 2200"))]
    pub compare_period: Option<i32>,
    /// Year compared against the baseline.
    #[validate(range(min = 1900, max = 2200, message = "must be a year between 1900 and 2200"))]
    pub current_period: Option<i32>,
}

/// Validated time-series request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesRequest {
    /// Record selection.
    pub filter: ObservationFilter,
    /// Bucket width.
    pub interval: Interval,
    /// Accumulated metric.
    pub metric: Metric,
}

/// Validated spatial-grid request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialRequest {
    /// Record selection.
    pub filter: ObservationFilter,
    /// Cell size in degrees, strictly positive.
    pub grid_size: f64,
}

/// Validated period-comparison request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonRequest {
    /// Record selection.
    pub filter: ObservationFilter,
    /// Baseline year.
    pub baseline_year: i32,
    /// Year compared against the baseline.
    pub current_year: i32,
}

impl IndicatorParams {
    fn checked_filter(&self, failure: &mut ValidationFailure) -> ObservationFilter {
        if let Err(errors) = self.validate() {
            failure.absorb(&errors);
        }
        let species_id = parse_species(self.species_id.as_deref(), failure);
        let start = parse_date("start_date", self.start_date.as_deref(), failure);
        let end = parse_date("end_date", self.end_date.as_deref(), failure);
        if let (Some(s), Some(e)) = (start, end)
            && s > e
        {
            failure.add("end_date", "must not be before start_date");
        }
        ObservationFilter { species_id, start, end }
    }

    /// Validate the species and date-range filter.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationFailure`] for malformed ids, dates, or ranges.
    pub fn filter(&self) -> Result<ObservationFilter, ValidationFailure> {
        let mut failure = ValidationFailure::default();
        let filter = self.checked_filter(&mut failure);
        failure.into_result(filter)
    }

    /// Validate a time-series request. Omitted `interval`/`metric` come
    /// from `defaults`; unrecognized values fall back to monthly and count.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationFailure`] for malformed filter fields.
    pub fn time_series(&self, defaults: &IndicatorsConfig) -> Result<TimeSeriesRequest, ValidationFailure> {
        let mut failure = ValidationFailure::default();
        let filter = self.checked_filter(&mut failure);
        let interval = match self.interval.as_deref() {
            None => defaults.default_interval,
            given => Interval::parse_or_default(given),
        };
        let metric = match self.metric.as_deref() {
            None => defaults.default_metric,
            given => Metric::parse_or_default(given),
        };
        failure.into_result(TimeSeriesRequest { filter, interval, metric })
    }

    /// Validate a spatial request, using `defaults.default_grid_size` when
    /// `grid_size` is omitted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationFailure`] for a non-positive or oversized grid
    /// or malformed filter fields.
    pub fn spatial(&self, defaults: &IndicatorsConfig) -> Result<SpatialRequest, ValidationFailure> {
        let mut failure = ValidationFailure::default();
        let filter = self.checked_filter(&mut failure);
        let grid_size = self.grid_size.unwrap_or(defaults.default_grid_size);
        if !grid_size.is_finite() && !failure.fields.contains_key("grid_size") {
            failure.add("grid_size", "must be a finite number");
        }
        failure.into_result(SpatialRequest { filter, grid_size })
    }

    /// Validate a comparison request. The baseline defaults to the year
    /// before `this_year`; the current period defaults to the year after
    /// the baseline.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationFailure`] for out-of-range years, a current
    /// period not after the baseline, or malformed filter fields.
    pub fn comparison(&self, this_year: i32) -> Result<ComparisonRequest, ValidationFailure> {
        let mut failure = ValidationFailure::default();
        let filter = self.checked_filter(&mut failure);
        let baseline_year = self.compare_period.unwrap_or_else(|| this_year.saturating_sub(1));
        let current_year = self.current_period.unwrap_or_else(|| baseline_year.saturating_add(1));
        if current_year <= baseline_year {
            failure.add("current_period", "must be after compare_period");
        }
        failure.into_result(ComparisonRequest {
            filter,
            baseline_year,
            current_year,
        })
    }
}

// ---------------------------------------------------------------------------
// Stored indicators
// ---------------------------------------------------------------------------

/// JSON body for creating a stored indicator.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateIndicatorBody {
    /// Display name.
    #[validate(length(min = 1, max = 100, message = "must be between 1 and 100 characters"))]
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// One of `count`, `density`, `diversity`, `abundance`, `frequency`.
    pub metric_type: String,
    /// The value, if already computed.
    pub value: Option<f64>,
    /// Unit label.
    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub unit: Option<String>,
    /// When the value was calculated; defaults to now.
    pub calculation_date: Option<DateTime<Utc>>,
}

/// A validated stored-indicator creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIndicator {
    /// Display name, trimmed.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Kind of value.
    pub metric_type: IndicatorMetricType,
    /// The value.
    pub value: Option<f64>,
    /// Unit label.
    pub unit: Option<String>,
    /// Calculation timestamp.
    pub calculation_date: DateTime<Utc>,
}

impl CreateIndicatorBody {
    /// Validate the body, stamping `now` when no calculation date was given.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationFailure`] for a bad name, unit, metric type, or
    /// non-finite value.
    pub fn validate_at(self, now: DateTime<Utc>) -> Result<NewIndicator, ValidationFailure> {
        let mut failure = ValidationFailure::from_validate(&self);
        let name = self.name.trim().to_owned();
        if name.is_empty() && !failure.fields.contains_key("name") {
            failure.add("name", "must not be blank");
        }
        let metric_type = match self.metric_type.parse::<IndicatorMetricType>() {
            Ok(m) => Some(m),
            Err(_) => {
                failure.add(
                    "metric_type",
                    "must be one of count, density, diversity, abundance, frequency",
                );
                None
            }
        };
        if let Some(v) = self.value
            && !v.is_finite()
        {
            failure.add("value", "must be a finite number");
        }
        match metric_type {
            Some(metric_type) if failure.is_empty() => Ok(NewIndicator {
                name,
                description: self.description,
                metric_type,
                value: self.value,
                unit: self.unit,
                calculation_date: self.calculation_date.unwrap_or(now),
            }),
            _ => Err(failure),
        }
    }
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// JSON body for submitting an export job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportBody {
    /// `csv` (default) or `json`.
    pub format: Option<String>,
    /// Restrict to one species (UUID).
    pub species_id: Option<String>,
    /// Inclusive lower date bound.
    pub start_date: Option<String>,
    /// Inclusive upper date bound.
    pub end_date: Option<String>,
}

/// A validated export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    /// Output format.
    pub format: ExportFormat,
    /// Record selection.
    pub filter: ObservationFilter,
}

impl ExportBody {
    /// Validate the body. Unlike query fallbacks, an unknown format is an
    /// error because it names the artifact the caller will download.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationFailure`] for an unknown format or malformed
    /// filter fields.
    pub fn validate(&self) -> Result<ExportRequest, ValidationFailure> {
        let mut failure = ValidationFailure::default();
        let format = match self.format.as_deref().map(str::parse::<ExportFormat>) {
            None => ExportFormat::default(),
            Some(Ok(f)) => f,
            Some(Err(_)) => {
                failure.add("format", "must be csv or json");
                ExportFormat::default()
            }
        };
        let species_id = parse_species(self.species_id.as_deref(), &mut failure);
        let start = parse_date("start_date", self.start_date.as_deref(), &mut failure);
        let end = parse_date("end_date", self.end_date.as_deref(), &mut failure);
        if let (Some(s), Some(e)) = (start, end)
            && s > e
        {
            failure.add("end_date", "must not be before start_date");
        }
        failure.into_result(ExportRequest {
            format,
            filter: ObservationFilter { species_id, start, end },
        })
    }
}
