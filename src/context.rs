//! Contextual feature acquisition for a target hour.
//!
//! The fetcher supplies the weather and holiday/event flags folded into
//! synthesized history rows. By contract it never fails to the caller: any
//! upstream problem degrades to [`HourlyContext::default`] so a flaky
//! weather API can never stall or skip a dispatch cycle.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

/// Flat context record for one target hour.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyContext {
    pub is_public_holiday: bool,
    pub is_local_event: bool,
    pub temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub snowfall: f64,
}

impl Default for HourlyContext {
    /// Mild-weather fallback used whenever the upstream fetch fails.
    fn default() -> Self {
        Self {
            is_public_holiday: false,
            is_local_event: false,
            temperature: 15.0,
            precipitation: 0.0,
            wind_speed: 10.0,
            snowfall: 0.0,
        }
    }
}

/// Supplies the context record for a target hour. Implementations must
/// degrade to defaults internally rather than surface an error.
#[async_trait::async_trait]
pub trait ContextFetcher: Send + Sync {
    async fn fetch(&self, target_hour: DateTime<Utc>) -> HourlyContext;
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    hourly: OpenMeteoHourly,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    time: Vec<String>,
    temperature_2m: Vec<f64>,
    precipitation: Vec<f64>,
    wind_speed_10m: Vec<f64>,
    snowfall: Vec<f64>,
}

/// Fetches hourly weather from the Open-Meteo forecast API for a fixed
/// point (the service area's centroid). Holiday and local-event flags have
/// no upstream source wired yet and stay at their defaults.
pub struct OpenMeteoContext {
    client: reqwest::Client,
    lat: f64,
    lon: f64,
}

impl OpenMeteoContext {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            client: reqwest::Client::new(),
            lat,
            lon,
        }
    }

    async fn fetch_weather(&self, target_hour: DateTime<Utc>) -> anyhow::Result<HourlyContext> {
        let url = format!(
            "https://api.open-meteo.com/v1/forecast?latitude={}&longitude={}\
             &hourly=temperature_2m,precipitation,wind_speed_10m,snowfall&timezone=UTC",
            self.lat, self.lon
        );
        let resp: OpenMeteoResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        context_at(&resp.hourly, target_hour)
    }
}

/// Pulls the context record for the target hour out of a forecast response.
/// Every series is bounds-checked against the time axis: a truncated or
/// malformed payload must surface as an error here, never a panic, so the
/// caller can degrade to defaults.
fn context_at(hourly: &OpenMeteoHourly, target_hour: DateTime<Utc>) -> anyhow::Result<HourlyContext> {
    // Open-Meteo reports hour slots as "2025-06-02T09:00".
    let slot = target_hour.format("%Y-%m-%dT%H:00").to_string();
    let idx = hourly
        .time
        .iter()
        .position(|t| *t == slot)
        .ok_or_else(|| anyhow::anyhow!("target hour {slot} not in forecast window"))?;

    let value = |series: &[f64], name: &str| {
        series
            .get(idx)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("{name} series shorter than time axis"))
    };

    Ok(HourlyContext {
        temperature: value(&hourly.temperature_2m, "temperature_2m")?,
        precipitation: value(&hourly.precipitation, "precipitation")?,
        wind_speed: value(&hourly.wind_speed_10m, "wind_speed_10m")?,
        snowfall: value(&hourly.snowfall, "snowfall")?,
        ..HourlyContext::default()
    })
}

#[async_trait::async_trait]
impl ContextFetcher for OpenMeteoContext {
    async fn fetch(&self, target_hour: DateTime<Utc>) -> HourlyContext {
        match self.fetch_weather(target_hour).await {
            Ok(ctx) => {
                debug!(
                    temperature = ctx.temperature,
                    precipitation = ctx.precipitation,
                    "Weather context fetched"
                );
                ctx
            }
            Err(e) => {
                warn!(error = %e, "Weather fetch failed, using default context");
                HourlyContext::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hourly(points: usize) -> OpenMeteoHourly {
        OpenMeteoHourly {
            time: (0..points)
                .map(|h| format!("2025-06-02T{h:02}:00"))
                .collect(),
            temperature_2m: vec![21.5; points],
            precipitation: vec![0.3; points],
            wind_speed_10m: vec![12.0; points],
            snowfall: vec![0.0; points],
        }
    }

    #[test]
    fn test_context_at_matches_target_slot() {
        let target = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let ctx = context_at(&hourly(24), target).unwrap();

        assert_eq!(ctx.temperature, 21.5);
        assert_eq!(ctx.precipitation, 0.3);
        assert_eq!(ctx.wind_speed, 12.0);
        assert_eq!(ctx.snowfall, 0.0);
        assert!(!ctx.is_public_holiday);
    }

    #[test]
    fn test_context_at_missing_slot_errors() {
        let target = Utc.with_ymd_and_hms(2025, 6, 3, 9, 0, 0).unwrap();
        assert!(context_at(&hourly(24), target).is_err());
    }

    #[test]
    fn test_context_at_truncated_series_errors_not_panics() {
        // A deserializable payload whose value series are shorter than the
        // time axis must come back as Err so fetch() can fall back to the
        // default record.
        let mut short = hourly(24);
        short.temperature_2m.truncate(5);
        short.snowfall.truncate(5);

        let target = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();
        let err = context_at(&short, target).unwrap_err();
        assert!(err.to_string().contains("shorter than time axis"));
    }

    #[test]
    fn test_default_context_values() {
        let ctx = HourlyContext::default();
        assert_eq!(ctx.temperature, 15.0);
        assert_eq!(ctx.precipitation, 0.0);
        assert_eq!(ctx.wind_speed, 10.0);
        assert_eq!(ctx.snowfall, 0.0);
        assert!(!ctx.is_public_holiday);
        assert!(!ctx.is_local_event);
    }
}
