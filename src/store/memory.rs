use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::Store;
use crate::geo::GeoPoint;
use crate::model::{
    DemandPrediction, HistoricalObservation, RouteDemand, ScheduleEntry, TripStatus, Vehicle,
    VehicleStatus,
};

#[derive(Default)]
struct Inner {
    history: Vec<HistoricalObservation>,
    predictions: Vec<DemandPrediction>,
    vehicles: HashMap<String, Vehicle>,
    schedule: Vec<ScheduleEntry>,
    route_starts: HashMap<String, GeoPoint>,
}

/// In-process [`Store`] holding the same four dynamic tables as Postgres.
/// Used by the integration tests and for local dry runs without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers reference data: a route and its start-stop location.
    pub fn add_route(&self, route_id: &str, start: GeoPoint) {
        let mut inner = self.inner.lock().unwrap();
        inner.route_starts.insert(route_id.to_string(), start);
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) {
        let mut inner = self.inner.lock().unwrap();
        inner.vehicles.insert(vehicle.vehicle_id.clone(), vehicle);
    }

    pub fn vehicle_status(&self, vehicle_id: &str) -> Option<VehicleStatus> {
        let inner = self.inner.lock().unwrap();
        inner.vehicles.get(vehicle_id).map(|v| v.status)
    }

    pub fn vehicle_statuses(&self) -> Vec<VehicleStatus> {
        let inner = self.inner.lock().unwrap();
        inner.vehicles.values().map(|v| v.status).collect()
    }

    pub fn schedule_entries(&self) -> Vec<ScheduleEntry> {
        let inner = self.inner.lock().unwrap();
        inner.schedule.clone()
    }

    pub fn history_len(&self, route_id: &str) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .history
            .iter()
            .filter(|o| o.route_id == route_id)
            .count()
    }

    pub fn predictions(&self) -> Vec<DemandPrediction> {
        let inner = self.inner.lock().unwrap();
        inner.predictions.clone()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn list_routes_with_history(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        let mut routes: Vec<String> = inner
            .history
            .iter()
            .map(|o| o.route_id.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        routes.sort();
        Ok(routes)
    }

    async fn load_recent_history(
        &self,
        route_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoricalObservation>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<HistoricalObservation> = inner
            .history
            .iter()
            .filter(|o| o.route_id == route_id)
            .cloned()
            .collect();
        rows.sort_by_key(|o| o.observed_at);
        let skip = rows.len().saturating_sub(limit);
        Ok(rows.split_off(skip))
    }

    async fn append_history(&self, rows: &[HistoricalObservation]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.history.extend_from_slice(rows);
        Ok(())
    }

    async fn upsert_predictions(&self, rows: &[DemandPrediction]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for pred in rows {
            inner
                .predictions
                .retain(|p| !(p.route_id == pred.route_id && p.target_hour == pred.target_hour));
            inner.predictions.push(pred.clone());
        }
        Ok(())
    }

    async fn load_latest_predictions(
        &self,
        target_hour: DateTime<Utc>,
    ) -> Result<Vec<RouteDemand>> {
        let inner = self.inner.lock().unwrap();
        let demands = inner
            .predictions
            .iter()
            .filter(|p| p.target_hour == target_hour)
            .filter_map(|p| {
                inner.route_starts.get(&p.route_id).map(|start| RouteDemand {
                    route_id: p.route_id.clone(),
                    predicted_passengers: p.predicted_passengers,
                    start_lat: start.lat,
                    start_lon: start.lon,
                })
            })
            .collect();
        Ok(demands)
    }

    async fn list_available_vehicles(&self) -> Result<Vec<Vehicle>> {
        let inner = self.inner.lock().unwrap();
        let mut vehicles: Vec<Vehicle> = inner
            .vehicles
            .values()
            .filter(|v| v.status == VehicleStatus::Available)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.vehicle_id.cmp(&b.vehicle_id));
        Ok(vehicles)
    }

    async fn find_expired_in_progress(&self, threshold: DateTime<Utc>) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        let ids = inner
            .schedule
            .iter()
            .filter(|e| e.status == TripStatus::InProgress && e.departure_at < threshold)
            .map(|e| e.vehicle_id.clone())
            .collect();
        Ok(ids)
    }

    async fn complete_trips(&self, vehicle_ids: &[String]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for entry in &mut inner.schedule {
            if entry.status == TripStatus::InProgress
                && vehicle_ids.contains(&entry.vehicle_id)
            {
                entry.status = TripStatus::Completed;
            }
        }
        for id in vehicle_ids {
            if let Some(vehicle) = inner.vehicles.get_mut(id) {
                vehicle.status = VehicleStatus::Available;
            }
        }
        Ok(())
    }

    async fn commit_schedule(&self, entries: &[ScheduleEntry]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.schedule.extend_from_slice(entries);
        for entry in entries {
            if let Some(vehicle) = inner.vehicles.get_mut(&entry.vehicle_id) {
                vehicle.status = VehicleStatus::InService;
            }
        }
        Ok(())
    }
}
