//! Per-route demand forecasting for the upcoming hour.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::model::DemandPrediction;
use crate::predictor::Predictor;
use crate::store::Store;

/// Runs the external predictor over each route's recent history window and
/// persists the resulting prediction batch.
pub struct ForecastRunner {
    store: Arc<dyn Store>,
    predictor: Arc<dyn Predictor>,
    sequence_length: usize,
}

impl ForecastRunner {
    pub fn new(
        store: Arc<dyn Store>,
        predictor: Arc<dyn Predictor>,
        sequence_length: usize,
    ) -> Self {
        Self {
            store,
            predictor,
            sequence_length,
        }
    }

    /// Produces one prediction per route that has a full history window.
    ///
    /// Routes with fewer than `sequence_length` observations are skipped,
    /// as are routes whose predictor call fails; neither aborts the batch.
    /// All predictions in the batch share one `generated_at` and the given
    /// target hour, and are persisted in a single upsert.
    #[tracing::instrument(skip(self), fields(target_hour = %target_hour))]
    pub async fn forecast_all(
        &self,
        target_hour: DateTime<Utc>,
    ) -> Result<Vec<DemandPrediction>> {
        let routes = self.store.list_routes_with_history().await?;
        let generated_at = Utc::now();
        let mut predictions = Vec::new();

        for route_id in &routes {
            let window = self
                .store
                .load_recent_history(route_id, self.sequence_length)
                .await?;

            if window.len() < self.sequence_length {
                warn!(
                    route_id = %route_id,
                    rows = window.len(),
                    required = self.sequence_length,
                    "Skipping route: not enough history"
                );
                continue;
            }

            match self.predictor.predict(&window).await {
                Ok(raw) => {
                    let predicted_passengers = raw.max(0.0).round() as i64;
                    info!(
                        route_id = %route_id,
                        predicted_passengers,
                        "Demand predicted"
                    );
                    predictions.push(DemandPrediction {
                        route_id: route_id.clone(),
                        target_hour,
                        predicted_passengers,
                        generated_at,
                    });
                }
                Err(e) => {
                    error!(route_id = %route_id, error = %e, "Prediction failed for route");
                }
            }
        }

        if !predictions.is_empty() {
            self.store.upsert_predictions(&predictions).await?;
            info!(count = predictions.len(), "Prediction batch saved");
        }

        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    use crate::context::HourlyContext;
    use crate::features::observation_from_prediction;
    use crate::model::HistoricalObservation;
    use crate::store::MemoryStore;

    struct FixedPredictor(HashMap<String, f64>);

    #[async_trait::async_trait]
    impl Predictor for FixedPredictor {
        async fn predict(&self, window: &[HistoricalObservation]) -> Result<f64> {
            let route = &window.last().unwrap().route_id;
            self.0
                .get(route)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no fixture for route {route}"))
        }
    }

    async fn seed_history(store: &MemoryStore, route: &str, hours: u32) {
        let rows: Vec<HistoricalObservation> = (0..hours)
            .map(|h| {
                let pred = DemandPrediction {
                    route_id: route.to_string(),
                    target_hour: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
                        + chrono::Duration::hours(h as i64),
                    predicted_passengers: 90,
                    generated_at: Utc::now(),
                };
                observation_from_prediction(&pred, &HourlyContext::default())
            })
            .collect();
        store.append_history(&rows).await.unwrap();
    }

    #[tokio::test]
    async fn test_route_with_short_history_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        seed_history(&store, "B41", 10).await;
        let predictor = Arc::new(FixedPredictor(HashMap::from([("B41".to_string(), 80.0)])));

        let runner = ForecastRunner::new(store.clone(), predictor, 24);
        let target = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let batch = runner.forecast_all(target).await.unwrap();

        assert!(batch.is_empty());
        assert!(store.predictions().is_empty());
    }

    #[tokio::test]
    async fn test_predictor_error_skips_route_not_batch() {
        let store = Arc::new(MemoryStore::new());
        seed_history(&store, "B41", 24).await;
        seed_history(&store, "B44", 24).await;
        // Only B44 has a fixture; B41's prediction errors out.
        let predictor = Arc::new(FixedPredictor(HashMap::from([("B44".to_string(), 130.0)])));

        let runner = ForecastRunner::new(store.clone(), predictor, 24);
        let target = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let batch = runner.forecast_all(target).await.unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].route_id, "B44");
        assert_eq!(batch[0].predicted_passengers, 130);
    }

    #[tokio::test]
    async fn test_negative_prediction_clips_to_zero() {
        let store = Arc::new(MemoryStore::new());
        seed_history(&store, "B41", 24).await;
        let predictor = Arc::new(FixedPredictor(HashMap::from([("B41".to_string(), -12.4)])));

        let runner = ForecastRunner::new(store.clone(), predictor, 24);
        let target = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let batch = runner.forecast_all(target).await.unwrap();

        assert_eq!(batch[0].predicted_passengers, 0);
    }

    #[tokio::test]
    async fn test_batch_shares_target_hour_and_timestamp() {
        let store = Arc::new(MemoryStore::new());
        seed_history(&store, "B41", 24).await;
        seed_history(&store, "B44", 24).await;
        let predictor = Arc::new(FixedPredictor(HashMap::from([
            ("B41".to_string(), 80.0),
            ("B44".to_string(), 130.0),
        ])));

        let runner = ForecastRunner::new(store.clone(), predictor, 24);
        let target = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let batch = runner.forecast_all(target).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|p| p.target_hour == target));
        assert!(batch.iter().all(|p| p.generated_at == batch[0].generated_at));
    }
}
