//! The scheduling core: demand → vehicle counts → greedy nearest
//! assignment with headway-spaced departures.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::geo::{HaversineIndex, NearestVehicles};
use crate::model::{RouteDemand, ScheduleEntry, TripStatus};
use crate::store::Store;

/// Vehicles needed to serve `predicted_passengers` at the given per-vehicle
/// capacity. Rounds to nearest with halves up — deliberately `round`, not
/// `ceil`: 74 passengers at capacity 50 still get one vehicle. Every route
/// with a prediction gets at least one.
pub fn required_vehicles(predicted_passengers: i64, effective_capacity: u32) -> usize {
    let ratio = predicted_passengers as f64 / effective_capacity as f64;
    ratio.round().max(1.0) as usize
}

/// Departure offset for the i-th of `assigned` vehicles on one route: the
/// hour is split into equal headways of 60/assigned minutes.
fn departure_offset(i: usize, assigned: usize) -> Duration {
    let headway_minutes = 60.0 / assigned as f64;
    Duration::milliseconds((i as f64 * headway_minutes * 60_000.0).round() as i64)
}

fn trip_id(route_id: &str, departure: DateTime<Utc>, i: usize) -> String {
    format!("SCHED-{}-{}-{}", route_id, departure.format("%Y%m%d%H%M%S"), i)
}

/// Greedy allocation over one fixed snapshot of available vehicles.
///
/// `demands` must already be sorted by predicted demand descending. Taking
/// vehicles from the index removes them, so later (lower-demand) routes can
/// never reuse a vehicle claimed earlier in the pass. An exhausted index
/// stops the pass outright; remaining routes get nothing this cycle.
pub fn allocate(
    demands: &[RouteDemand],
    index: &mut dyn NearestVehicles,
    target_hour: DateTime<Utc>,
    effective_capacity: u32,
) -> Vec<ScheduleEntry> {
    let mut entries = Vec::new();

    for demand in demands {
        if index.remaining() == 0 {
            warn!("Ran out of available vehicles, cannot schedule remaining routes");
            break;
        }

        let needed = required_vehicles(demand.predicted_passengers, effective_capacity);
        let assigned = index.take_nearest(demand.start_location(), needed);

        if assigned.len() < needed {
            warn!(
                route_id = %demand.route_id,
                assigned = assigned.len(),
                needed,
                "Partial fulfillment: fewer vehicles than required"
            );
        }
        if assigned.is_empty() {
            continue;
        }

        for (i, vehicle) in assigned.iter().enumerate() {
            let departure_at = target_hour + departure_offset(i, assigned.len());
            entries.push(ScheduleEntry {
                route_id: demand.route_id.clone(),
                trip_id: trip_id(&demand.route_id, departure_at, i),
                vehicle_id: vehicle.vehicle_id.clone(),
                departure_at,
                status: TripStatus::InProgress,
            });
        }
    }

    entries
}

/// Turns the latest prediction batch into a committed hourly schedule.
pub struct AssignmentEngine {
    store: Arc<dyn Store>,
    effective_capacity: u32,
}

impl AssignmentEngine {
    pub fn new(store: Arc<dyn Store>, effective_capacity: u32) -> Self {
        Self {
            store,
            effective_capacity,
        }
    }

    /// Builds and commits the schedule for the target hour. Returns the
    /// number of trips created.
    ///
    /// Allocation decisions are made incrementally per route against one
    /// point-in-time snapshot, but the resulting entries and vehicle status
    /// flips commit as a single batch at the end.
    #[tracing::instrument(skip(self), fields(target_hour = %target_hour))]
    pub async fn schedule(&self, target_hour: DateTime<Utc>) -> Result<usize> {
        let mut demands = self.store.load_latest_predictions(target_hour).await?;
        if demands.is_empty() {
            info!("No predictions found for the target hour, skipping scheduling");
            return Ok(0);
        }

        // Higher-demand routes claim vehicles first; stable sort leaves
        // ties in load order, which is acceptable and unspecified.
        demands.sort_by(|a, b| b.predicted_passengers.cmp(&a.predicted_passengers));

        let snapshot = self.store.list_available_vehicles().await?;
        info!(
            routes = demands.len(),
            available = snapshot.len(),
            "Starting assignment pass"
        );
        let mut index = HaversineIndex::new(snapshot);

        let entries = allocate(&demands, &mut index, target_hour, self.effective_capacity);

        if entries.is_empty() {
            info!("No trips could be scheduled this cycle");
            return Ok(0);
        }

        self.store.commit_schedule(&entries).await?;
        info!(trips = entries.len(), "Schedule committed");
        Ok(entries.len())
    }
}
