//! Geographic calculations

use crate::types::{Coordinates, TravelMode};

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Road distance coefficient (straight line to road)
pub const ROAD_COEFFICIENT: f64 = 1.3;

/// Average door-to-door speed in km/h per travel mode
pub const fn average_speed_kmh(mode: TravelMode) -> f64 {
    match mode {
        TravelMode::Driving => 40.0,
        TravelMode::Walking => 5.0,
        TravelMode::Transit => 20.0,
    }
}

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Estimate road distance from straight-line distance (km)
pub fn road_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    haversine_distance(from, to) * ROAD_COEFFICIENT
}

/// Estimate travel time in seconds for the given mode
pub fn travel_time_seconds(from: &Coordinates, to: &Coordinates, mode: TravelMode) -> f64 {
    road_distance(from, to) / average_speed_kmh(mode) * 3600.0
}
