//! Latitude/longitude binning into a regular grid.
//!
//! The grid is anchored at the south-west corner of the data
//! (`min_lat`, `min_lon`) and steps by `grid_size` along each axis. Every
//! emitted cell covers the half-open square
//! `[latitude, latitude + g) x [longitude, longitude + g)`, and membership
//! is decided against exactly those bounds, so a record lies inside the
//! advertised bounds of the one cell that counts it.
//!
//! Each axis is swept once in sorted order and empty stretches are
//! skipped, so the cost follows the number of records rather than the
//! number of cells in the bounding box.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use ts_rs::TS;

use biosurvey_types::ObservationRecord;

/// One non-empty grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpatialCell {
    /// Latitude of the cell's south-west corner.
    pub latitude: f64,
    /// Longitude of the cell's south-west corner.
    pub longitude: f64,
    /// Number of records inside the cell.
    pub density: u64,
}

/// Cell assignment along one axis: every distinct coordinate with the
/// ordinal and origin of the cell holding it.
struct Axis {
    slots: Vec<(f64, usize, f64)>,
}

impl Axis {
    /// Sweep `values` in ascending order. `None` when `g` is too small to
    /// move past an origin.
    fn build(values: impl Iterator<Item = f64>, g: f64) -> Option<Self> {
        let mut distinct: Vec<f64> = values.collect();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup_by(|a, b| a.total_cmp(b).is_eq());

        let mut iter = distinct.into_iter();
        let first = iter.next()?;
        let mut origin = first;
        let mut ordinal = 0usize;
        let mut slots = vec![(first, ordinal, origin)];
        for value in iter {
            if value >= origin + g {
                origin = advance(origin, value, g)?;
                ordinal = ordinal.checked_add(1)?;
            }
            slots.push((value, ordinal, origin));
        }
        Some(Self { slots })
    }

    fn cell(&self, value: f64) -> Option<(usize, f64)> {
        let pos = self.slots.binary_search_by(|slot| slot.0.total_cmp(&value)).ok()?;
        self.slots.get(pos).map(|&(_, ordinal, origin)| (ordinal, origin))
    }
}

/// Move `origin` forward until `[origin, origin + g)` holds `value`.
///
/// Long empty stretches are crossed in one jump; a jump is taken only when
/// it lands past the previous cell's upper bound and not past `value`.
fn advance(mut origin: f64, value: f64, g: f64) -> Option<f64> {
    while value >= origin + g {
        let single = origin + g;
        if single <= origin {
            return None;
        }
        let steps = ((value - origin) / g).floor();
        let jumped = steps.mul_add(g, origin);
        origin = if steps > 1.0 && jumped > single && jumped <= value {
            jumped
        } else {
            single
        };
    }
    Some(origin)
}

/// Bin `records` into a grid of `grid_size` degrees.
///
/// Returns only non-empty cells, ordered by latitude then longitude. A
/// non-positive or non-finite `grid_size`, or one too small to step across
/// the coordinates, yields no cells.
pub fn build_spatial_grid(records: &[ObservationRecord], grid_size: f64) -> Vec<SpatialCell> {
    if records.is_empty() || !grid_size.is_finite() || grid_size <= 0.0 {
        return Vec::new();
    }

    let (Some(lat_axis), Some(lon_axis)) = (
        Axis::build(records.iter().map(|r| r.latitude), grid_size),
        Axis::build(records.iter().map(|r| r.longitude), grid_size),
    ) else {
        return Vec::new();
    };

    let mut cells: BTreeMap<(usize, usize), SpatialCell> = BTreeMap::new();
    for record in records {
        let (Some((i, latitude)), Some((j, longitude))) =
            (lat_axis.cell(record.latitude), lon_axis.cell(record.longitude))
        else {
            continue;
        };
        let cell = cells.entry((i, j)).or_insert(SpatialCell {
            latitude,
            longitude,
            density: 0,
        });
        cell.density = cell.density.saturating_add(1);
    }

    cells.into_values().collect()
}

/// Render cells as a GeoJSON `FeatureCollection` of square polygons.
///
/// Coordinates follow GeoJSON order (`[longitude, latitude]`) and each ring
/// is closed. Every feature carries `density` in its properties.
pub fn grid_to_geojson(cells: &[SpatialCell], grid_size: f64) -> Value {
    let features: Vec<Value> = cells
        .iter()
        .map(|cell| {
            let (w, s) = (cell.longitude, cell.latitude);
            let (e, n) = (w + grid_size, s + grid_size);
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[w, s], [e, s], [e, n], [w, n], [w, s]]],
                },
                "properties": {
                    "density": cell.density,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}
