//! Geographic helpers: Haversine distance, the operational geofence, and
//! proximity ranking for search results.
//!
//! Every location a user submits (request location, profile location, search
//! origin) goes through [`GeoPoint::new`] so coordinates are always finite and
//! inside the valid lat/lng ranges before any distance is computed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Errors produced while validating coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("invalid latitude {0}")]
    InvalidLatitude(f64),

    #[error("invalid longitude {0}")]
    InvalidLongitude(f64),

    #[error("location is {distance_km:.1} km from the service center (limit {radius_km:.1} km)")]
    OutsideArea { distance_km: f64, radius_km: f64 },
}

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::InvalidLongitude(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Build a point from optional columns; both must be present.
    pub fn from_parts(lat: Option<f64>, lng: Option<f64>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::new(lat, lng).ok(),
            _ => None,
        }
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(*self, *other)
    }

    /// Lat/lng rectangle that contains every point within `radius_km`.
    ///
    /// Used as a cheap SQL prefilter before the exact Haversine check. Near
    /// the poles or across the antimeridian the longitude span widens to the
    /// whole range.
    pub fn bounding_box(&self, radius_km: f64) -> BoundingBox {
        let d_lat = (radius_km * BOX_MARGIN / KM_PER_DEGREE).min(180.0);
        let min_lat = (self.lat - d_lat).max(-90.0);
        let max_lat = (self.lat + d_lat).min(90.0);

        let cos_lat = self.lat.to_radians().cos();
        let (min_lng, max_lng) = if cos_lat < 1e-6 || min_lat <= -90.0 || max_lat >= 90.0 {
            (-180.0, 180.0)
        } else {
            let d_lng = radius_km * BOX_MARGIN / (KM_PER_DEGREE * cos_lat);
            let (lo, hi) = (self.lng - d_lng, self.lng + d_lng);
            if lo < -180.0 || hi > 180.0 {
                (-180.0, 180.0)
            } else {
                (lo, hi)
            }
        };

        BoundingBox {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }
}

/// Kilometres per degree of latitude on the mean-radius sphere.
const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// Slack applied to the bounding box so rounding never excludes an edge point.
const BOX_MARGIN: f64 = 1.01;

/// Axis-aligned lat/lng rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = ((d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Round a distance to one decimal place for display.
pub fn round_km(distance_km: f64) -> f64 {
    (distance_km * 10.0).round() / 10.0
}

/// Fixed-radius circle around the town center where the platform operates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Geofence {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl Geofence {
    pub fn new(center: GeoPoint, radius_km: f64) -> Self {
        Self {
            center,
            radius_km: radius_km.max(0.0),
        }
    }

    /// Boundary is inclusive.
    pub fn contains(&self, point: GeoPoint) -> bool {
        haversine_km(self.center, point) <= self.radius_km
    }

    /// Returns the distance from the center, or `OutsideArea`.
    pub fn check(&self, point: GeoPoint) -> Result<f64, GeoError> {
        let distance_km = haversine_km(self.center, point);
        if distance_km <= self.radius_km {
            Ok(distance_km)
        } else {
            Err(GeoError::OutsideArea {
                distance_km: round_km(distance_km),
                radius_km: self.radius_km,
            })
        }
    }
}

/// Keep items within `radius_km` of `origin`, nearest first.
///
/// Items without a location are dropped. The sort is stable, so equally
/// distant items keep their input order.
pub fn rank_by_distance<T, F>(
    origin: GeoPoint,
    items: Vec<T>,
    radius_km: f64,
    location_of: F,
) -> Vec<(T, f64)>
where
    F: Fn(&T) -> Option<GeoPoint>,
{
    let mut ranked: Vec<(T, f64)> = items
        .into_iter()
        .filter_map(|item| {
            let point = location_of(&item)?;
            let distance = haversine_km(origin, point);
            (distance <= radius_km).then_some((item, distance))
        })
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[test]
    fn test_haversine_known_distance() {
        // Porto Alegre to Santa Maria is roughly 250 km.
        let poa = point(-30.0346, -51.2177);
        let santa_maria = point(-29.6842, -53.8069);
        let d = haversine_km(poa, santa_maria);
        assert!((d - 251.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn test_haversine_identity_and_symmetry() {
        let a = point(-29.6447, -53.2515);
        let b = point(-29.6000, -53.2000);
        assert_eq!(haversine_km(a, a), 0.0);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_antipodal_is_finite() {
        let d = haversine_km(point(0.0, 0.0), point(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_point_validation() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
        assert!(GeoPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_geofence_contains_and_check() {
        let fence = Geofence::new(point(-29.6447, -53.2515), 15.0);
        assert!(fence.contains(point(-29.6447, -53.2515)));
        assert!(fence.contains(point(-29.70, -53.30)));

        let far = point(-30.0346, -51.2177);
        assert!(!fence.contains(far));
        match fence.check(far) {
            Err(GeoError::OutsideArea {
                distance_km,
                radius_km,
            }) => {
                assert!(distance_km > 15.0);
                assert_eq!(radius_km, 15.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_zero_radius_fence_only_contains_center() {
        let center = point(10.0, 10.0);
        let fence = Geofence::new(center, 0.0);
        assert!(fence.contains(center));
        assert!(!fence.contains(point(10.001, 10.0)));
    }

    #[test]
    fn test_rank_by_distance_filters_and_sorts() {
        let origin = point(0.0, 0.0);
        let items = vec![
            ("far", Some(point(0.0, 0.2))),
            ("none", None),
            ("near", Some(point(0.0, 0.01))),
            ("mid", Some(point(0.0, 0.05))),
            ("out", Some(point(0.0, 1.0))),
        ];

        let ranked = rank_by_distance(origin, items, 25.0, |(_, p)| *p);
        let names: Vec<_> = ranked.iter().map(|((name, _), _)| *name).collect();
        assert_eq!(names, vec!["near", "mid", "far"]);
        assert!(ranked.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_bounding_box_contains_radius() {
        let origin = point(-29.6447, -53.2515);
        let bbox = origin.bounding_box(10.0);
        assert!(bbox.min_lat < origin.lat && origin.lat < bbox.max_lat);
        assert!(bbox.min_lng < origin.lng && origin.lng < bbox.max_lng);

        // A point 9.9 km due north stays inside the box.
        let north = point(origin.lat + 9.9 / KM_PER_DEGREE, origin.lng);
        assert!(north.lat <= bbox.max_lat);
        assert!(haversine_km(origin, north) < 10.0);
    }

    #[test]
    fn test_bounding_box_widens_near_antimeridian() {
        let bbox = point(0.0, 179.99).bounding_box(50.0);
        assert_eq!((bbox.min_lng, bbox.max_lng), (-180.0, 180.0));
        let polar = point(89.99, 0.0).bounding_box(50.0);
        assert_eq!(polar.max_lat, 90.0);
        assert_eq!((polar.min_lng, polar.max_lng), (-180.0, 180.0));
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(1.26), 1.3);
        assert_eq!(round_km(0.04), 0.0);
    }
}
