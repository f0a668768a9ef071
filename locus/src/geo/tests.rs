//! Tests for great-circle geometry

use super::*;

const LONDON: (f64, f64) = (51.5074, -0.1278);
const PARIS: (f64, f64) = (48.8566, 2.3522);

#[test]
fn test_distance_to_self_is_zero() {
    let points = [LONDON, PARIS, (0.0, 0.0), (-33.8688, 151.2093), (89.9, 179.9)];
    for p in points {
        let c = Coordinate::from(p);
        assert_eq!(distance_meters(c, c), 0.0, "distance({:?}, itself)", p);
    }
}

#[test]
fn test_distance_is_symmetric() {
    let points = [
        LONDON,
        PARIS,
        (0.0, 0.0),
        (-33.8688, 151.2093),
        (40.7128, -74.0060),
        (0.0, 179.9),
        (0.0, -179.9),
    ];
    for a in points {
        for b in points {
            let ab = distance_meters(a.into(), b.into());
            let ba = distance_meters(b.into(), a.into());
            assert!(
                (ab - ba).abs() < 1e-6,
                "distance not symmetric for {:?} / {:?}: {} vs {}",
                a,
                b,
                ab,
                ba
            );
        }
    }
}

#[test]
fn test_london_to_paris() {
    // Well-known great-circle distance is ~343.5km
    let d = distance_meters(LONDON.into(), PARIS.into());
    assert!((d - 343_500.0).abs() < 1_000.0, "got {}m", d);
}

#[test]
fn test_short_distance_in_meters() {
    // 0.001 degrees of latitude is ~111m everywhere
    let a = Coordinate::from((51.5, -0.12));
    let b = Coordinate::from((51.501, -0.12));
    let d = distance_meters(a, b);
    assert!((d - 111.19).abs() < 0.1, "got {}m", d);
}

#[test]
fn test_distance_across_antimeridian() {
    // 0.2 degrees of longitude at the equator, not 359.8
    let d = distance_meters((0.0, 179.9).into(), (0.0, -179.9).into());
    assert!((d - 22_239.0).abs() < 5.0, "got {}m", d);
}

#[test]
fn test_antipodal_points_do_not_produce_nan() {
    let d = distance_meters((0.0, 0.0).into(), (0.0, 180.0).into());
    assert!(d.is_finite());
    assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
}

#[test]
fn test_nan_propagates() {
    let d = distance_meters((f64::NAN, 0.0).into(), (0.0, 0.0).into());
    assert!(d.is_nan());
}

#[test]
fn test_bearing_cardinal_directions() {
    let origin = Coordinate::from((0.0, 0.0));
    assert!(bearing_degrees(origin, (1.0, 0.0).into()).abs() < 0.01);
    assert!((bearing_degrees(origin, (0.0, 1.0).into()) - 90.0).abs() < 0.01);
    assert!((bearing_degrees(origin, (-1.0, 0.0).into()) - 180.0).abs() < 0.01);
    assert!((bearing_degrees(origin, (0.0, -1.0).into()) - 270.0).abs() < 0.01);
}

#[test]
fn test_valid_coordinate() {
    let c = Coordinate::new(51.5074, -0.1278).unwrap();
    assert_eq!(c.as_tuple(), LONDON);
}

#[test]
fn test_invalid_latitude() {
    assert!(matches!(
        Coordinate::new(90.5, 0.0),
        Err(CoordError::InvalidLatitude(_))
    ));
    assert!(matches!(
        Coordinate::new(f64::NAN, 0.0),
        Err(CoordError::InvalidLatitude(_))
    ));
}

#[test]
fn test_invalid_longitude() {
    assert!(matches!(
        Coordinate::new(0.0, -180.5),
        Err(CoordError::InvalidLongitude(_))
    ));
}

#[test]
fn test_coord_error_display() {
    let err = CoordError::InvalidLatitude(95.0);
    assert_eq!(
        err.to_string(),
        "Invalid latitude: 95 (must be between -90 and 90)"
    );
}

#[test]
fn test_normalize_longitude() {
    assert_eq!(normalize_longitude(0.0), 0.0);
    assert!((normalize_longitude(190.0) - (-170.0)).abs() < 1e-9);
    assert!((normalize_longitude(-190.0) - 170.0).abs() < 1e-9);
    assert_eq!(normalize_longitude(180.0), 180.0);
    assert_eq!(normalize_longitude(-180.0), -180.0);
}
