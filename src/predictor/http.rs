use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use super::Predictor;
use crate::model::HistoricalObservation;

#[derive(Serialize)]
struct PredictRequest<'a> {
    route_id: &'a str,
    window: &'a [HistoricalObservation],
}

#[derive(Deserialize)]
struct PredictResponse {
    predicted_passengers: f64,
}

/// Client for the demand model server's `/predict` endpoint.
pub struct HttpPredictor {
    client: reqwest::Client,
    url: String,
    sequence_length: usize,
}

impl HttpPredictor {
    pub fn new(url: impl Into<String>, sequence_length: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            sequence_length,
        }
    }
}

#[async_trait::async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, window: &[HistoricalObservation]) -> Result<f64> {
        if window.len() < self.sequence_length {
            bail!(
                "window has {} rows, model requires {}",
                window.len(),
                self.sequence_length
            );
        }

        let route_id = window
            .last()
            .map(|o| o.route_id.as_str())
            .unwrap_or_default();
        let body = PredictRequest { route_id, window };

        let resp: PredictResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp.predicted_passengers)
    }
}
