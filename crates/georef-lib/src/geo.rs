//! Coordinates and great-circle distance.
//!
//! Distances use the haversine formula on a sphere with the Earth's mean
//! radius. The spherical model is accurate to roughly 0.5% against the
//! ellipsoid, which is well inside what "nearest city" needs.

use crate::error::{Error, Result};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated latitude/longitude pair in decimal degrees.
///
/// Latitude is within `[-90, 90]` and longitude within `[-180, 180]`; both
/// are finite. The only way to obtain a `Coordinate` is through
/// [`Coordinate::new`], so every value in circulation satisfies the ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if Self::is_valid(latitude, longitude) {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(Error::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    /// Returns true if the pair would produce a valid coordinate.
    pub fn is_valid(latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to another coordinate in kilometres.
    pub fn distance_to(&self, other: &Self) -> f64 {
        haversine_km(*self, *other)
    }

    /// Position on the unit sphere (x towards 0°E on the equator, z towards the north pole).
    ///
    /// Straight-line (chord) distance between unit vectors grows monotonically
    /// with great-circle distance, which is what lets a Euclidean KD-tree
    /// answer great-circle nearest-neighbour queries.
    pub fn to_unit_vector(self) -> [f64; 3] {
        let lat = self.latitude.to_radians();
        let lon = self.longitude.to_radians();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }
}

/// Haversine great-circle distance between two coordinates, in kilometres.
///
/// Symmetric, exactly zero for identical points, and never NaN for valid
/// coordinates: the haversine term is clamped to `[0, 1]` before the square
/// roots so rounding near antipodal points cannot leave the domain.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = lat2 - lat1;
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Round a distance to two decimal places for output.
///
/// Uses round-half-away-from-zero. Comparisons must always use the
/// unrounded value.
pub fn round_km(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}
