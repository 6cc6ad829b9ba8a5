//! Vehicle pool reclamation.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::store::Store;

/// Returns vehicles whose assumed trip time has elapsed to the available
/// pool. This is the only mechanism that replenishes the usable fleet.
pub struct PoolManager {
    store: Arc<dyn Store>,
    trip_duration_minutes: i64,
}

impl PoolManager {
    pub fn new(store: Arc<dyn Store>, trip_duration_minutes: i64) -> Self {
        Self {
            store,
            trip_duration_minutes,
        }
    }

    /// Completes every in_progress trip that departed more than the trip
    /// duration before `now`, folding its vehicle back to available in the
    /// same transaction. Returns the number of vehicles reclaimed.
    ///
    /// Idempotent: a second pass over the same state reclaims nothing.
    #[tracing::instrument(skip(self), fields(now = %now))]
    pub async fn reclaim(&self, now: DateTime<Utc>) -> Result<usize> {
        let threshold = now - Duration::minutes(self.trip_duration_minutes);
        let vehicle_ids = self.store.find_expired_in_progress(threshold).await?;

        if vehicle_ids.is_empty() {
            info!("No vehicles to reclaim this cycle");
            return Ok(0);
        }

        self.store.complete_trips(&vehicle_ids).await?;
        info!(
            reclaimed = vehicle_ids.len(),
            "Returned vehicles to the available pool"
        );
        Ok(vehicle_ids.len())
    }
}
