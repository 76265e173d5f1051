//! Great-circle distance and spherical polygon measurements.

use stridefall_common::{Coordinate, EARTH_RADIUS_M};

/// Haversine great-circle distance between two points, in meters.
pub fn haversine_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Total length of a path (sum of consecutive haversine distances), meters.
pub fn path_length(path: &[Coordinate]) -> f64 {
    path.windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .sum()
}

/// Area of a polygon on the sphere, in m². Small-area approximation valid
/// at city scale; always non-negative regardless of winding.
pub fn spherical_polygon_area(ring: &[Coordinate]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..ring.len() {
        let j = (i + 1) % ring.len();
        let lat1 = ring[i].lat.to_radians();
        let lat2 = ring[j].lat.to_radians();
        let lng1 = ring[i].lng.to_radians();
        let lng2 = ring[j].lng.to_radians();
        area += (lng2 - lng1) * (2.0 + lat1.sin() + lat2.sin());
    }
    (area * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs()
}

/// Perimeter of a polygon ring (wrapping last→first), meters.
pub fn perimeter(ring: &[Coordinate]) -> f64 {
    if ring.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..ring.len() {
        let j = (i + 1) % ring.len();
        total += haversine_distance(&ring[i], &ring[j]);
    }
    total
}

/// Average pace in min/km. Zero-distance runs pace at 0 rather than dividing
/// by zero.
pub fn average_pace_min_per_km(distance_m: f64, duration_s: f64) -> f64 {
    if distance_m == 0.0 {
        return 0.0;
    }
    (duration_s / 60.0) / (distance_m / 1000.0)
}
