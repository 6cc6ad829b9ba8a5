//! Runtime configuration, gathered once from the environment and passed
//! explicitly into the orchestrator and engine.

use std::time::Duration;

use anyhow::{Context, Result};

/// Tunables for the dispatch cycle.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub database_url: String,
    pub predictor_url: String,
    /// Assumed passengers one vehicle serves per hour.
    pub effective_capacity: u32,
    /// Assumed end-to-end trip time; drives the reclaim threshold. If this
    /// undershoots real travel times the pool starves silently.
    pub trip_duration_minutes: i64,
    /// History window length the demand model expects.
    pub sequence_length: usize,
    pub weather_lat: f64,
    pub weather_lon: f64,
    pub db_connect_retries: u32,
    pub db_retry_delay: Duration,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}")),
        Err(_) => Ok(default),
    }
}

impl DispatchConfig {
    /// Reads configuration from the environment (after `dotenvy` has run).
    /// Only `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            predictor_url: env_or(
                "PREDICTOR_URL",
                "http://localhost:8500/predict".to_string(),
            )?,
            effective_capacity: env_or("EFFECTIVE_BUS_CAPACITY", 50)?,
            trip_duration_minutes: env_or("TRIP_DURATION_MINUTES", 55)?,
            sequence_length: env_or("SEQUENCE_LENGTH", 24)?,
            weather_lat: env_or("WEATHER_LAT", 40.71)?,
            weather_lon: env_or("WEATHER_LON", -74.01)?,
            db_connect_retries: env_or("DB_CONNECT_RETRIES", 10)?,
            db_retry_delay: Duration::from_secs(env_or("DB_RETRY_DELAY_SECS", 5u64)?),
        })
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            predictor_url: String::new(),
            effective_capacity: 50,
            trip_duration_minutes: 55,
            sequence_length: 24,
            weather_lat: 40.71,
            weather_lon: -74.01,
            db_connect_retries: 10,
            db_retry_delay: Duration::from_secs(5),
        }
    }
}
