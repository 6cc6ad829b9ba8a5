//! Deterministic calendar feature derivation for synthesized history rows.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::context::HourlyContext;
use crate::model::{DemandPrediction, HistoricalObservation};

/// Calendar fields the demand model was trained on, all derived from a
/// single timestamp. Weekday is 0 = Monday through 6 = Sunday.
#[derive(Debug, Clone, Copy)]
pub struct CalendarFeatures {
    pub hour_of_day: i32,
    pub day_of_week: i32,
    pub day_of_year: i32,
    pub month: i32,
    pub is_weekend: bool,
    pub hour_sin: f64,
    pub hour_cos: f64,
    pub day_of_week_sin: f64,
    pub day_of_week_cos: f64,
}

impl CalendarFeatures {
    pub fn for_hour(ts: DateTime<Utc>) -> Self {
        let hour = ts.hour() as i32;
        let weekday = ts.weekday().num_days_from_monday() as i32;
        Self {
            hour_of_day: hour,
            day_of_week: weekday,
            day_of_year: ts.ordinal() as i32,
            month: ts.month() as i32,
            is_weekend: weekday >= 5,
            hour_sin: (2.0 * PI * hour as f64 / 24.0).sin(),
            hour_cos: (2.0 * PI * hour as f64 / 24.0).cos(),
            day_of_week_sin: (2.0 * PI * weekday as f64 / 7.0).sin(),
            day_of_week_cos: (2.0 * PI * weekday as f64 / 7.0).cos(),
        }
    }
}

/// Builds the synthetic history row for one prediction: the forecast count
/// stands in for observed ridership and for all three lag values, since no
/// ground truth exists at forecast time.
pub fn observation_from_prediction(
    pred: &DemandPrediction,
    ctx: &HourlyContext,
) -> HistoricalObservation {
    let cal = CalendarFeatures::for_hour(pred.target_hour);
    HistoricalObservation {
        route_id: pred.route_id.clone(),
        observed_at: pred.target_hour,
        ridership: pred.predicted_passengers,
        hour_of_day: cal.hour_of_day,
        day_of_week: cal.day_of_week,
        day_of_year: cal.day_of_year,
        month: cal.month,
        is_weekend: cal.is_weekend,
        hour_sin: cal.hour_sin,
        hour_cos: cal.hour_cos,
        day_of_week_sin: cal.day_of_week_sin,
        day_of_week_cos: cal.day_of_week_cos,
        is_public_holiday: ctx.is_public_holiday,
        is_local_event: ctx.is_local_event,
        temperature: ctx.temperature,
        precipitation: ctx.precipitation,
        wind_speed: ctx.wind_speed,
        snowfall: ctx.snowfall,
        ridership_lag_1h: pred.predicted_passengers,
        ridership_lag_24h: pred.predicted_passengers,
        ridership_lag_168h: pred.predicted_passengers,
    }
}
