//! Geodesic ring generation for the probe fallback, plus the great-circle
//! distance helper shared with the nearest-address branch.
//!
//! Spherical earth approximation throughout; at the 100 m probe scale the
//! ellipsoidal correction is far below boundary digitization error.

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Default probe ring radius.
pub const PROBE_RADIUS_M: f64 = 100.0;

/// Default probe bearings: a full ring in 45° steps, tried in this order.
pub const PROBE_BEARINGS_DEG: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

/// Translate a WGS84 point `distance_m` metres along `bearing_deg`
/// (0 = north, 90 = east). Returns (lat, lon) degrees.
#[must_use]
pub fn geodesic_destination(lat: f64, lon: f64, bearing_deg: f64, distance_m: f64) -> (f64, f64) {
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let phi2 =
        (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    (phi2.to_degrees(), lambda2.to_degrees())
}

/// Great-circle distance between two WGS84 points, metres.
#[must_use]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Candidate points around an unresolved coordinate, in bearing order.
#[must_use]
pub fn probe_ring(lat: f64, lon: f64, radius_m: f64, bearings_deg: &[f64]) -> Vec<(f64, f64)> {
    bearings_deg
        .iter()
        .map(|&bearing| geodesic_destination(lat, lon, bearing, radius_m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_north_increases_latitude_only() {
        let (lat, lon) = geodesic_destination(40.0, -8.0, 0.0, 1000.0);
        assert!((lon - -8.0).abs() < 1e-9);
        assert!(lat > 40.0);
        assert!((haversine_distance_m(40.0, -8.0, lat, lon) - 1000.0).abs() < 0.5);
    }

    #[test]
    fn destination_east_increases_longitude() {
        let (lat, lon) = geodesic_destination(40.0, -8.0, 90.0, 1000.0);
        assert!(lon > -8.0);
        assert!((lat - 40.0).abs() < 1e-3);
        assert!((haversine_distance_m(40.0, -8.0, lat, lon) - 1000.0).abs() < 0.5);
    }

    #[test]
    fn ring_has_one_point_per_bearing_at_the_right_distance() {
        let ring = probe_ring(40.10, -8.50, PROBE_RADIUS_M, &PROBE_BEARINGS_DEG);
        assert_eq!(ring.len(), 8);
        for (lat, lon) in ring {
            let d = haversine_distance_m(40.10, -8.50, lat, lon);
            assert!((d - PROBE_RADIUS_M).abs() < 0.1, "distance {d}");
        }
    }

    #[test]
    fn haversine_matches_known_degree_length() {
        // One degree of latitude is ~111.2 km on the sphere.
        let d = haversine_distance_m(40.0, -8.0, 41.0, -8.0);
        assert!((d - 111_195.0).abs() < 100.0, "distance {d}");
    }

    #[test]
    fn opposite_bearings_cancel() {
        let (lat, lon) = geodesic_destination(40.10, -8.50, 45.0, 500.0);
        let (lat2, lon2) = geodesic_destination(lat, lon, 225.0, 500.0);
        assert!(haversine_distance_m(40.10, -8.50, lat2, lon2) < 0.05);
    }
}
