//! Geographic helpers: great-circle distance and bounding boxes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Construct a point.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let h = (lat1.cos() * lat2.cos()).mul_add(sin_dlon * sin_dlon, sin_dlat * sin_dlat);
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Axis-aligned extent of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BoundingBox {
    /// Southern edge.
    pub min_latitude: f64,
    /// Northern edge.
    pub max_latitude: f64,
    /// Western edge.
    pub min_longitude: f64,
    /// Eastern edge.
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Smallest box containing every point, or `None` for no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self {
            min_latitude: first.latitude,
            max_latitude: first.latitude,
            min_longitude: first.longitude,
            max_longitude: first.longitude,
        };
        for p in iter {
            bbox.min_latitude = bbox.min_latitude.min(p.latitude);
            bbox.max_latitude = bbox.max_latitude.max(p.latitude);
            bbox.min_longitude = bbox.min_longitude.min(p.longitude);
            bbox.max_longitude = bbox.max_longitude.max(p.longitude);
        }
        Some(bbox)
    }

    /// South-west corner.
    pub const fn south_west(&self) -> GeoPoint {
        GeoPoint::new(self.min_latitude, self.min_longitude)
    }

    /// North-east corner.
    pub const fn north_east(&self) -> GeoPoint {
        GeoPoint::new(self.max_latitude, self.max_longitude)
    }

    /// Corner-to-corner great-circle distance in kilometers.
    pub fn diagonal_km(&self) -> f64 {
        haversine_km(self.south_west(), self.north_east())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero_distance() {
        let p = GeoPoint::new(-1.2921, 36.8219);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn nairobi_to_mombasa() {
        let nairobi = GeoPoint::new(-1.2921, 36.8219);
        let mombasa = GeoPoint::new(-4.0435, 39.6682);
        let d = haversine_km(nairobi, mombasa);
        assert!((d - 440.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.01);
    }

    #[test]
    fn bounding_box_covers_all_points() {
        let bbox = BoundingBox::from_points([
            GeoPoint::new(1.0, 30.0),
            GeoPoint::new(-2.0, 35.5),
            GeoPoint::new(0.5, 33.0),
        ])
        .unwrap();
        assert!((bbox.min_latitude + 2.0).abs() < f64::EPSILON);
        assert!((bbox.max_longitude - 35.5).abs() < f64::EPSILON);
        assert!(bbox.diagonal_km() > 0.0);
    }

    #[test]
    fn empty_points_have_no_box() {
        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }
}
