//! Great-circle distance filtering.

use geo::Point;

/// Earth radius used for listing distances, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two points (x = lon, y = lat).
pub fn haversine_km(from: Point<f64>, to: Point<f64>) -> f64 {
    let lat1 = from.y().to_radians();
    let lat2 = to.y().to_radians();
    let d_lat = (to.y() - from.y()).to_radians();
    let d_lon = (to.x() - from.x()).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Returns the distance when `to` lies within `radius_km` of `from`.
pub fn within_radius(from: Point<f64>, to: Point<f64>, radius_km: f64) -> Option<f64> {
    let distance = haversine_km(from, to);
    (distance <= radius_km).then_some(distance)
}
