//! Nearest-hospital selection
//!
//! Linear scan over the hospital roster, great-circle distance via the
//! haversine formula. Adequate at this cardinality; a spatial index could
//! replace the scan behind the same `nearest` signature if the roster grows.

use crate::models::Hospital;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two coordinate pairs.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// The hospital with known coordinates closest to the alert origin, or
/// `None` when no hospital has coordinates. Exact ties keep the first
/// hospital in iteration order.
pub fn nearest(hospitals: &[Hospital], lat: f64, lon: f64) -> Option<&Hospital> {
    let mut best: Option<(&Hospital, f64)> = None;

    for hospital in hospitals {
        let (Some(h_lat), Some(h_lon)) = (hospital.latitude, hospital.longitude) else {
            continue;
        };
        let distance = haversine_km(lat, lon, h_lat, h_lon);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((hospital, distance)),
        }
    }

    best.map(|(hospital, _)| hospital)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hospital(id: i64, lat: Option<f64>, lon: Option<f64>) -> Hospital {
        Hospital {
            id,
            hospital_name: format!("Hospital {}", id),
            latitude: lat,
            longitude: lon,
            expo_push_token: None,
        }
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Bengaluru to Chennai, roughly 290 km
        let d = haversine_km(12.9716, 77.5946, 13.0827, 80.2707);
        assert!((d - 290.0).abs() < 15.0, "got {}", d);
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        assert!(haversine_km(12.9, 77.6, 12.9, 77.6) < 1e-9);
    }

    #[test]
    fn picks_the_closer_hospital() {
        let hospitals = vec![
            hospital(2002, Some(13.00), Some(78.00)), // ~45 km out
            hospital(2001, Some(12.91), Some(77.61)), // ~2 km out
        ];
        let chosen = nearest(&hospitals, 12.90, 77.60).unwrap();
        assert_eq!(chosen.id, 2001);
    }

    #[test]
    fn skips_hospitals_without_coordinates() {
        let hospitals = vec![
            hospital(2001, None, None),
            hospital(2002, Some(13.00), Some(78.00)),
        ];
        let chosen = nearest(&hospitals, 12.90, 77.60).unwrap();
        assert_eq!(chosen.id, 2002);
    }

    #[test]
    fn no_coordinates_anywhere_means_no_match() {
        let hospitals = vec![hospital(2001, None, None), hospital(2002, None, Some(78.0))];
        assert!(nearest(&hospitals, 12.90, 77.60).is_none());
    }

    #[test]
    fn exact_tie_keeps_first_in_iteration_order() {
        let hospitals = vec![
            hospital(2001, Some(12.95), Some(77.65)),
            hospital(2002, Some(12.95), Some(77.65)),
        ];
        let chosen = nearest(&hospitals, 12.90, 77.60).unwrap();
        assert_eq!(chosen.id, 2001);
    }

    #[test]
    fn empty_roster_means_no_match() {
        assert!(nearest(&[], 12.90, 77.60).is_none());
    }
}
