//! Persistence seam for the dispatch pipeline.
//!
//! [`Store`] is the async trait over the four dynamic tables (history,
//! predictions, vehicles, schedule) plus the route reference data.
//! [`PgStore`] implements it against Postgres; [`MemoryStore`] is an
//! in-process implementation for tests and local dry runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::model::{
    DemandPrediction, HistoricalObservation, RouteDemand, ScheduleEntry, Vehicle,
};

/// Operations the dispatch cycle needs from the relational store.
///
/// `complete_trips` and `commit_schedule` are each a single transaction:
/// the pair of row mutations they bundle (schedule status + vehicle status)
/// must never be observed half-applied.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Distinct route ids that have at least one history row.
    async fn list_routes_with_history(&self) -> Result<Vec<String>>;

    /// The most recent `limit` observations for a route, time-ascending.
    /// Returns fewer rows when the route's history is shorter.
    async fn load_recent_history(
        &self,
        route_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoricalObservation>>;

    /// Appends one batch of synthesized observations.
    async fn append_history(&self, rows: &[HistoricalObservation]) -> Result<()>;

    /// Writes one cycle's prediction batch, replacing any earlier
    /// prediction for the same (route, target hour).
    async fn upsert_predictions(&self, rows: &[DemandPrediction]) -> Result<()>;

    /// Predictions for the target hour joined with each route's start
    /// location. Routes without a known start location are not returned.
    async fn load_latest_predictions(
        &self,
        target_hour: DateTime<Utc>,
    ) -> Result<Vec<RouteDemand>>;

    /// Point-in-time snapshot of every vehicle currently available.
    async fn list_available_vehicles(&self) -> Result<Vec<Vehicle>>;

    /// Vehicle ids with an in_progress schedule entry that departed before
    /// `threshold`.
    async fn find_expired_in_progress(&self, threshold: DateTime<Utc>) -> Result<Vec<String>>;

    /// Marks the in_progress entries of these vehicles completed and the
    /// vehicles available, atomically.
    async fn complete_trips(&self, vehicle_ids: &[String]) -> Result<()>;

    /// Inserts the schedule entries and marks their vehicles in_service,
    /// atomically.
    async fn commit_schedule(&self, entries: &[ScheduleEntry]) -> Result<()>;
}
