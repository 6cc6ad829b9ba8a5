//! Geographic primitives and the nearest-vehicle selection capability.

use crate::model::Vehicle;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Selection of available vehicles by proximity during one scheduling pass.
///
/// Taking vehicles removes them from the underlying set, so a single pass
/// can never hand the same vehicle to two routes. The backing structure is
/// an implementation choice; nothing above this trait assumes how distance
/// is computed or indexed.
pub trait NearestVehicles {
    /// Removes and returns up to `k` vehicles nearest to `from`, closest
    /// first. May return fewer than `k` when the set runs short.
    fn take_nearest(&mut self, from: GeoPoint, k: usize) -> Vec<Vehicle>;

    /// Number of vehicles still selectable.
    fn remaining(&self) -> usize;
}

/// Flat haversine scan over a point-in-time snapshot of available vehicles.
///
/// Fleet sizes here are hundreds of vehicles, so a linear scan per route
/// beats maintaining a spatial tree.
pub struct HaversineIndex {
    vehicles: Vec<Vehicle>,
}

impl HaversineIndex {
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        Self { vehicles }
    }
}

impl NearestVehicles for HaversineIndex {
    fn take_nearest(&mut self, from: GeoPoint, k: usize) -> Vec<Vehicle> {
        self.vehicles.sort_by(|a, b| {
            let da = haversine_m(a.home_location(), from);
            let db = haversine_m(b.home_location(), from);
            da.total_cmp(&db)
        });
        let take = k.min(self.vehicles.len());
        self.vehicles.drain(..take).collect()
    }

    fn remaining(&self) -> usize {
        self.vehicles.len()
    }
}
