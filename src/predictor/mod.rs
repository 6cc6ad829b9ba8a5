//! Demand predictor abstraction.
//!
//! The trained model lives behind an HTTP model server; the trait keeps the
//! pipeline independent of where inference actually runs.

mod http;

pub use http::HttpPredictor;

use anyhow::Result;

use crate::model::HistoricalObservation;

/// Produces a next-hour passenger estimate from a time-ascending window of
/// a route's recent history.
///
/// Implementations must reject windows shorter than the sequence length the
/// model was trained on. The returned value may be fractional or negative;
/// the caller clips it.
#[async_trait::async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, window: &[HistoricalObservation]) -> Result<f64>;
}
