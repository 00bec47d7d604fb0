//! Great-circle distance and ETA estimation for booking navigation.
//!
//! Pure helpers shared by the tracking loop and the UI. Distances use the
//! haversine formula with a fixed Earth radius; ETAs assume a constant
//! average driving speed (configurable, 40 km/h by default).

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Great-circle distance in kilometres between two WGS84 coordinates.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lon = (delta_lon / 2.0).sin();

    let h = sin_lat * sin_lat + phi1.cos() * phi2.cos() * sin_lon * sin_lon;
    let central_angle = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

/// Minutes to cover `distance_km` at `avg_speed_kmh`, rounded up.
///
/// Callers feed this haversine output, so negative distances are not handled.
pub fn eta_minutes(distance_km: f64, avg_speed_kmh: f64) -> u32 {
    (distance_km / avg_speed_kmh * 60.0).ceil() as u32
}

/// Human-readable distance: metres below one kilometre, otherwise one decimal.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as i64)
    } else {
        format!("{:.1} km", km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        let d = haversine_km(12.9716, 77.5946, 12.9716, 77.5946);
        assert!(d < 1e-9);
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        let ba = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        // 1% tolerance around ~111.2 km
        assert!((d - 111.2).abs() / 111.2 < 0.01, "got {d}");
    }

    #[test]
    fn bengaluru_fix_to_destination() {
        let d = haversine_km(12.9716, 77.5946, 12.9352, 77.6245);
        assert!((d - 5.3).abs() < 0.2, "got {d}");
        assert_eq!(eta_minutes(d, 40.0), 8);
    }

    #[test]
    fn eta_at_average_speed() {
        assert_eq!(eta_minutes(40.0, 40.0), 60);
        assert_eq!(eta_minutes(0.0, 40.0), 0);
        assert_eq!(eta_minutes(20.0, 40.0), 30);
    }

    #[test]
    fn eta_rounds_up_partial_minutes() {
        assert_eq!(eta_minutes(1.0, 40.0), 2);
    }

    #[test]
    fn distance_formatting() {
        assert_eq!(format_distance(0.4), "400 m");
        assert_eq!(format_distance(5.25), "5.3 km");
        assert_eq!(format_distance(0.0), "0 m");
    }
}
