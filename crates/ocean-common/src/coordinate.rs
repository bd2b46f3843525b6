//! Geographic coordinate validation and normalization.
//!
//! Every coordinate stored or emitted by the engine is canonical:
//! latitude in [-90, 90], longitude in (-180, 180]. Normalization
//! happens exactly once, at the query boundary.

use serde::{Deserialize, Serialize};

use crate::error::{OceanError, OceanResult};

/// Mean Earth radius in kilometers (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// A canonical geographic coordinate.
///
/// Latitude is in [-90, 90]; longitude is in (-180, 180]. The boundary
/// convention: 180.0 exactly stays 180.0, while 180.0001 wraps to
/// -179.9999 and an input of -180.0 canonicalizes to 180.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Validate and canonicalize a latitude/longitude pair.
    ///
    /// Latitude outside [-90, 90] fails with `InvalidCoordinate`.
    /// Any finite longitude is wrapped into (-180, 180] and never
    /// fails; non-finite components are rejected since they cannot
    /// be wrapped.
    pub fn normalize(latitude: f64, longitude: f64) -> OceanResult<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(OceanError::InvalidCoordinate(format!(
                "latitude {} outside [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() {
            return Err(OceanError::InvalidCoordinate(format!(
                "longitude {} is not finite",
                longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude: wrap_longitude(longitude),
        })
    }

    /// Great-circle distance to another coordinate in kilometers.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self, other)
    }
}

/// Wrap a longitude into the canonical (-180, 180] range.
///
/// Idempotent: already-canonical values pass through bit-identical.
pub fn wrap_longitude(lon: f64) -> f64 {
    if lon > -180.0 && lon <= 180.0 {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid lands -180.0 on the excluded boundary; fold it to +180.
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Haversine great-circle distance between two coordinates, in km.
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_passthrough() {
        let c = Coordinate::normalize(25.0, -40.0).unwrap();
        assert_eq!(c.latitude, 25.0);
        assert_eq!(c.longitude, -40.0);
    }

    #[test]
    fn test_latitude_out_of_range() {
        assert!(Coordinate::normalize(91.0, 0.0).is_err());
        assert!(Coordinate::normalize(-90.5, 0.0).is_err());
        assert!(Coordinate::normalize(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_latitude_boundaries_accepted() {
        assert!(Coordinate::normalize(90.0, 0.0).is_ok());
        assert!(Coordinate::normalize(-90.0, 0.0).is_ok());
    }

    #[test]
    fn test_longitude_wrap() {
        let c = Coordinate::normalize(0.0, 200.0).unwrap();
        assert!((c.longitude - -160.0).abs() < 1e-9);

        let c = Coordinate::normalize(0.0, -200.0).unwrap();
        assert!((c.longitude - 160.0).abs() < 1e-9);

        let c = Coordinate::normalize(0.0, 540.0).unwrap();
        assert_eq!(c.longitude, 180.0);
    }

    #[test]
    fn test_antimeridian_convention() {
        // 180.0 exactly stays 180.0
        let c = Coordinate::normalize(0.0, 180.0).unwrap();
        assert_eq!(c.longitude, 180.0);

        // just past the antimeridian wraps negative
        let c = Coordinate::normalize(0.0, 180.0001).unwrap();
        assert!((c.longitude - -179.9999).abs() < 1e-9);

        // -180.0 input canonicalizes to +180.0
        let c = Coordinate::normalize(0.0, -180.0).unwrap();
        assert_eq!(c.longitude, 180.0);
    }

    #[test]
    fn test_wrap_idempotent() {
        for lon in [-720.5, -180.0, -179.999, 0.0, 37.25, 180.0, 359.0, 1234.5] {
            let once = wrap_longitude(lon);
            assert!(once > -180.0 && once <= 180.0, "lon {} -> {}", lon, once);
            assert_eq!(wrap_longitude(once), once);
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude at the equator is ~111.2 km.
        let a = Coordinate::normalize(0.0, 0.0).unwrap();
        let b = Coordinate::normalize(1.0, 0.0).unwrap();
        let d = haversine_km(&a, &b);
        assert!((d - 111.19).abs() < 0.5, "got {}", d);
    }

    #[test]
    fn test_haversine_zero() {
        let a = Coordinate::normalize(42.0, 13.0).unwrap();
        assert_eq!(haversine_km(&a, &a), 0.0);
    }
}
