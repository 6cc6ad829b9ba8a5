//! Domain rows shared across the dispatch pipeline.
//!
//! These map one-to-one onto the dynamic tables in `schema.sql`:
//! vehicles, historical_observations, demand_predictions, schedule_entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Lifecycle state of a vehicle in the fleet pool.
///
/// `Completed` is a transient marker: the reclaim pass that observes an
/// expired trip folds the vehicle straight back to `Available`, so after
/// any completed cycle a vehicle rests in one of the other two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "vehicle_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Available,
    InService,
    Completed,
}

/// One fleet vehicle with its home depot location.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub vehicle_id: String,
    pub status: VehicleStatus,
    pub home_depot_id: String,
    pub home_lat: f64,
    pub home_lon: f64,
}

impl Vehicle {
    pub fn home_location(&self) -> GeoPoint {
        GeoPoint {
            lat: self.home_lat,
            lon: self.home_lon,
        }
    }
}

/// One (route, hour) row of the append-only ridership history.
///
/// Rows written by the history recorder are synthetic: `ridership` and the
/// three lag columns carry the forecast for that hour, not observed truth.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoricalObservation {
    pub route_id: String,
    pub observed_at: DateTime<Utc>,
    pub ridership: i64,

    // calendar features, all derived from observed_at
    pub hour_of_day: i32,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: i32,
    pub day_of_year: i32,
    pub month: i32,
    pub is_weekend: bool,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub day_of_week_sin: f64,
    pub day_of_week_cos: f64,

    // context features
    pub is_public_holiday: bool,
    pub is_local_event: bool,
    pub temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub snowfall: f64,

    // lag features
    pub ridership_lag_1h: i64,
    pub ridership_lag_24h: i64,
    pub ridership_lag_168h: i64,
}

/// A single next-hour demand forecast for one route.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DemandPrediction {
    pub route_id: String,
    pub target_hour: DateTime<Utc>,
    pub predicted_passengers: i64,
    pub generated_at: DateTime<Utc>,
}

/// A prediction joined with the route's start location, as consumed by the
/// assignment engine.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RouteDemand {
    pub route_id: String,
    pub predicted_passengers: i64,
    pub start_lat: f64,
    pub start_lon: f64,
}

impl RouteDemand {
    pub fn start_location(&self) -> GeoPoint {
        GeoPoint {
            lat: self.start_lat,
            lon: self.start_lon,
        }
    }
}

/// State of one dispatched trip. No cancellation path exists; the only
/// transition is in_progress → completed, made by the reclaim pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "trip_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    InProgress,
    Completed,
}

/// One scheduled trip: a vehicle departing a route at a fixed time.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduleEntry {
    pub route_id: String,
    pub trip_id: String,
    pub vehicle_id: String,
    pub departure_at: DateTime<Utc>,
    pub status: TripStatus,
}
