use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{error, info, warn};

use super::Store;
use crate::model::{
    DemandPrediction, HistoricalObservation, RouteDemand, ScheduleEntry, Vehicle,
};

/// Postgres-backed [`Store`] over a sqlx connection pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects with bounded retries and a fixed delay between attempts.
    /// Exhausting the retries is fatal to the caller.
    pub async fn connect(url: &str, retries: u32, retry_delay: Duration) -> Result<Self> {
        let mut attempts_left = retries;
        loop {
            match PgPoolOptions::new().max_connections(5).connect(url).await {
                Ok(pool) => {
                    info!("Connected to Postgres");
                    return Ok(Self { pool });
                }
                Err(e) if attempts_left > 1 => {
                    attempts_left -= 1;
                    warn!(
                        error = %e,
                        attempts_left,
                        delay_secs = retry_delay.as_secs(),
                        "Database connection failed, retrying"
                    );
                    tokio::time::sleep(retry_delay).await;
                }
                Err(e) => {
                    error!(error = %e, "Database connection failed permanently");
                    return Err(e).context("could not connect to the database");
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn list_routes_with_history(&self) -> Result<Vec<String>> {
        let routes = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT route_id FROM historical_observations ORDER BY route_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(routes)
    }

    async fn load_recent_history(
        &self,
        route_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoricalObservation>> {
        let mut rows = sqlx::query_as::<_, HistoricalObservation>(
            "SELECT * FROM historical_observations \
             WHERE route_id = $1 ORDER BY observed_at DESC LIMIT $2",
        )
        .bind(route_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.reverse();
        Ok(rows)
    }

    async fn append_history(&self, rows: &[HistoricalObservation]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for obs in rows {
            sqlx::query(
                "INSERT INTO historical_observations \
                 (route_id, observed_at, ridership, hour_of_day, day_of_week, day_of_year, \
                  month, is_weekend, hour_sin, hour_cos, day_of_week_sin, day_of_week_cos, \
                  is_public_holiday, is_local_event, temperature, precipitation, wind_speed, \
                  snowfall, ridership_lag_1h, ridership_lag_24h, ridership_lag_168h) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                         $16, $17, $18, $19, $20, $21)",
            )
            .bind(&obs.route_id)
            .bind(obs.observed_at)
            .bind(obs.ridership)
            .bind(obs.hour_of_day)
            .bind(obs.day_of_week)
            .bind(obs.day_of_year)
            .bind(obs.month)
            .bind(obs.is_weekend)
            .bind(obs.hour_sin)
            .bind(obs.hour_cos)
            .bind(obs.day_of_week_sin)
            .bind(obs.day_of_week_cos)
            .bind(obs.is_public_holiday)
            .bind(obs.is_local_event)
            .bind(obs.temperature)
            .bind(obs.precipitation)
            .bind(obs.wind_speed)
            .bind(obs.snowfall)
            .bind(obs.ridership_lag_1h)
            .bind(obs.ridership_lag_24h)
            .bind(obs.ridership_lag_168h)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn upsert_predictions(&self, rows: &[DemandPrediction]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for pred in rows {
            sqlx::query(
                "INSERT INTO demand_predictions \
                 (route_id, target_hour, predicted_passengers, generated_at) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (route_id, target_hour) DO UPDATE SET \
                 predicted_passengers = EXCLUDED.predicted_passengers, \
                 generated_at = EXCLUDED.generated_at",
            )
            .bind(&pred.route_id)
            .bind(pred.target_hour)
            .bind(pred.predicted_passengers)
            .bind(pred.generated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn load_latest_predictions(
        &self,
        target_hour: DateTime<Utc>,
    ) -> Result<Vec<RouteDemand>> {
        let demands = sqlx::query_as::<_, RouteDemand>(
            "SELECT p.route_id, p.predicted_passengers, \
                    s.stop_lat AS start_lat, s.stop_lon AS start_lon \
             FROM demand_predictions p \
             JOIN routes r ON r.route_id = p.route_id \
             JOIN stops s ON s.stop_id = r.start_stop_id \
             WHERE p.target_hour = $1",
        )
        .bind(target_hour)
        .fetch_all(&self.pool)
        .await?;
        Ok(demands)
    }

    async fn list_available_vehicles(&self) -> Result<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(
            "SELECT vehicle_id, status, home_depot_id, home_lat, home_lon \
             FROM vehicles WHERE status = 'available'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(vehicles)
    }

    async fn find_expired_in_progress(&self, threshold: DateTime<Utc>) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT vehicle_id FROM schedule_entries \
             WHERE status = 'in_progress' AND departure_at < $1",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn complete_trips(&self, vehicle_ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "UPDATE schedule_entries SET status = 'completed' \
             WHERE vehicle_id = ANY($1) AND status = 'in_progress'",
        )
        .bind(vehicle_ids)
        .execute(&mut *tx)
        .await?;
        sqlx::query("UPDATE vehicles SET status = 'available' WHERE vehicle_id = ANY($1)")
            .bind(vehicle_ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_schedule(&self, entries: &[ScheduleEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT INTO schedule_entries \
                 (route_id, trip_id, vehicle_id, departure_at, status) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(&entry.route_id)
            .bind(&entry.trip_id)
            .bind(&entry.vehicle_id)
            .bind(entry.departure_at)
            .bind(entry.status)
            .execute(&mut *tx)
            .await?;
        }
        let vehicle_ids: Vec<String> = entries.iter().map(|e| e.vehicle_id.clone()).collect();
        sqlx::query("UPDATE vehicles SET status = 'in_service' WHERE vehicle_id = ANY($1)")
            .bind(&vehicle_ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
