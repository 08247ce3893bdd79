//! Circular pick buffers on the sphere.

use geo::{Coord, LineString, Polygon};

use crate::config::{METERS_PER_PIXEL_EQUATOR, PICK_TOLERANCE_PX};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Number of vertices approximating a pick circle.
pub const CIRCLE_STEPS: usize = 10;

/// Ground distance covered by one screen pixel at `level`, at the equator.
pub fn meters_per_pixel(level: u8) -> f64 {
    METERS_PER_PIXEL_EQUATOR / 2f64.powi(level as i32)
}

/// Point reached from `origin` (lon/lat degrees) after `distance_m` metres
/// along `bearing_deg`.
pub fn destination(origin: Coord<f64>, distance_m: f64, bearing_deg: f64) -> Coord<f64> {
    let lon1 = origin.x.to_radians();
    let lat1 = origin.y.to_radians();
    let bearing = bearing_deg.to_radians();
    let r = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * r.cos() + lat1.cos() * r.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * r.sin() * lat1.cos()).atan2(r.cos() - lat1.sin() * lat2.sin());

    Coord {
        x: lon2.to_degrees(),
        y: lat2.to_degrees(),
    }
}

/// Closed polygon approximating a circle of `radius_m` around `center`.
pub fn circle(center: Coord<f64>, radius_m: f64, steps: usize) -> Polygon<f64> {
    let steps = steps.max(3);
    let mut ring: Vec<Coord<f64>> = (0..steps)
        .map(|i| destination(center, radius_m, i as f64 * -360.0 / steps as f64))
        .collect();
    ring.push(ring[0]);
    Polygon::new(LineString::new(ring), Vec::new())
}

/// The pick buffer for a click at (`lon`, `lat`) viewed at `level`.
pub fn pick_buffer(lon: f64, lat: f64, level: u8) -> Polygon<f64> {
    circle(
        Coord { x: lon, y: lat },
        PICK_TOLERANCE_PX * meters_per_pixel(level),
        CIRCLE_STEPS,
    )
}
