//! Feeds each cycle's predictions back into the historical series.
//!
//! The synthesized rows are what the next cycle's forecast windows read, so
//! forecast error compounds over time. That feedback is deliberate: no
//! ground-truth ridership exists at forecast time in this deployment, and
//! the system trusts its own output as the next input. Do not replace this
//! with a ground-truth lookup.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::context::ContextFetcher;
use crate::features::observation_from_prediction;
use crate::model::{DemandPrediction, HistoricalObservation};
use crate::store::Store;

pub struct HistoryRecorder {
    store: Arc<dyn Store>,
    context: Arc<dyn ContextFetcher>,
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn Store>, context: Arc<dyn ContextFetcher>) -> Self {
        Self { store, context }
    }

    /// Appends one synthetic observation per prediction, sharing a single
    /// context fetch for the batch's target hour. No-op on an empty batch.
    #[tracing::instrument(skip(self, predictions), fields(count = predictions.len()))]
    pub async fn record(&self, predictions: &[DemandPrediction]) -> Result<()> {
        let Some(first) = predictions.first() else {
            info!("No new predictions to add to history");
            return Ok(());
        };

        let ctx = self.context.fetch(first.target_hour).await;

        let rows: Vec<HistoricalObservation> = predictions
            .iter()
            .map(|pred| observation_from_prediction(pred, &ctx))
            .collect();

        self.store.append_history(&rows).await?;
        info!(
            rows = rows.len(),
            target_hour = %first.target_hour,
            "History updated with synthesized observations"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::context::HourlyContext;
    use crate::store::MemoryStore;

    struct StormContext;

    #[async_trait::async_trait]
    impl ContextFetcher for StormContext {
        async fn fetch(&self, _target_hour: DateTime<Utc>) -> HourlyContext {
            HourlyContext {
                temperature: -3.0,
                snowfall: 4.5,
                ..HourlyContext::default()
            }
        }
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let recorder = HistoryRecorder::new(store.clone(), Arc::new(StormContext));

        recorder.record(&[]).await.unwrap();
        assert_eq!(store.history_len("B41"), 0);
    }

    #[tokio::test]
    async fn test_batch_appends_one_row_per_prediction_with_context() {
        let store = Arc::new(MemoryStore::new());
        let recorder = HistoryRecorder::new(store.clone(), Arc::new(StormContext));
        let hour = Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap();

        let preds = vec![
            DemandPrediction {
                route_id: "B41".to_string(),
                target_hour: hour,
                predicted_passengers: 140,
                generated_at: Utc::now(),
            },
            DemandPrediction {
                route_id: "B44".to_string(),
                target_hour: hour,
                predicted_passengers: 60,
                generated_at: Utc::now(),
            },
        ];
        recorder.record(&preds).await.unwrap();

        assert_eq!(store.history_len("B41"), 1);
        assert_eq!(store.history_len("B44"), 1);

        let window = store.load_recent_history("B41", 24).await.unwrap();
        assert_eq!(window[0].ridership, 140);
        assert_eq!(window[0].temperature, -3.0);
        assert_eq!(window[0].snowfall, 4.5);
        assert_eq!(window[0].ridership_lag_168h, 140);
    }
}
