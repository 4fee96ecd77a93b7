//! Great-circle distance and nearby-stop filtering.

use crate::kmb::Stop;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Haversine distance between two points, in metres.
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Stops within `radius_m` of `origin`, nearest first, paired with their
/// distance. Stops without parsable coordinates are skipped.
pub fn stops_within(stops: &[Stop], origin: Coordinate, radius_m: f64) -> Vec<(Stop, f64)> {
    let mut nearby: Vec<(Stop, f64)> = stops
        .iter()
        .filter_map(|stop| {
            let distance = haversine_distance(origin, stop.coordinate()?);
            (distance <= radius_m).then(|| (stop.clone(), distance))
        })
        .collect();
    nearby.sort_by(|a, b| a.1.total_cmp(&b.1));
    nearby
}
