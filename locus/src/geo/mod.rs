//! Great-circle geometry.
//!
//! Distance and bearing between WGS84 coordinates on a spherical Earth.
//! Every other component of the engine measures space through this module.
//!
//! # Coordinate System
//!
//! - Latitude: degrees north (-90 to 90)
//! - Longitude: degrees east (-180 to 180)
//! - Bearing: degrees true (0-360, 0=north, 90=east)
//! - Distance: meters

mod types;

pub use types::{CoordError, Coordinate, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate the great-circle distance between two coordinates.
///
/// Uses the haversine formula on a sphere of radius [`EARTH_RADIUS_M`].
/// NaN inputs propagate to a NaN result; validating input is the caller's job.
///
/// # Example
///
/// ```
/// use locus::geo::{distance_meters, Coordinate};
///
/// let a = Coordinate::from((0.0, 0.0));
/// let b = Coordinate::from((0.0, 1.0));
/// let d = distance_meters(a, b);
/// assert!((d - 111_195.0).abs() < 1.0); // one degree of longitude at the equator
/// ```
#[inline]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards asin against rounding just above 1.0 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Calculate the initial bearing from one coordinate to another.
///
/// Returns the forward azimuth in degrees (0-360, 0=north, 90=east).
/// Identical points yield 0.
pub fn bearing_degrees(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = y.atan2(x).to_degrees();
    (bearing + 360.0) % 360.0
}

/// Normalize a longitude into the -180..180 range.
#[inline]
pub(crate) fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 to -180; keep the original sign for the boundary
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests;
