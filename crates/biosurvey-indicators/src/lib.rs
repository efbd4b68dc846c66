//! Ecological indicator engine.
//!
//! Every function in this crate is pure: it takes an already
//! authorization-filtered slice of [`ObservationRecord`]s plus scalar
//! parameters and returns plain serializable data. There is no I/O, no
//! shared state, and no error path; degenerate input produces documented
//! zero values.
//!
//! # Modules
//!
//! - [`filter`] -- species and date-range selection
//! - [`aggregate`] -- per-species totals and calendar buckets
//! - [`diversity`] -- richness, Shannon, Simpson, evenness
//! - [`time_series`] -- aligned `dates`/`values` columns for charts
//! - [`spatial`] -- grid binning and GeoJSON rendering
//! - [`compare`] -- year-over-year diversity deltas
//! - [`geo`] -- haversine distance and bounding boxes
//! - [`summary`] -- project statistics for reports
//!
//! [`ObservationRecord`]: biosurvey_types::ObservationRecord

pub mod aggregate;
pub mod compare;
pub mod diversity;
pub mod filter;
pub mod geo;
pub mod spatial;
pub mod summary;
pub mod time_series;

pub use aggregate::{SpeciesAbundance, TimeSeriesPoint, aggregate_by_species, aggregate_by_time, species_abundances};
pub use compare::{DiversityDelta, PeriodComparison, PeriodIndices, compare_periods};
pub use diversity::{DiversityIndices, compute_diversity, evenness, shannon_index, simpson_index, species_richness};
pub use filter::ObservationFilter;
pub use geo::{BoundingBox, GeoPoint, haversine_km};
pub use spatial::{SpatialCell, build_spatial_grid, grid_to_geojson};
pub use summary::{GeographicExtent, ProjectSummary, SpeciesBreakdown, summarize_project};
pub use time_series::{TimeSeries, build_time_series};
