//! Hourly cycle orchestration.
//!
//! One sequential worker: reclaim → forecast → history → schedule, then
//! sleep until the next wall-clock hour boundary. Cycles never overlap by
//! construction; nothing here guards against a second concurrent
//! orchestrator, which could double-assign vehicles.

use anyhow::Result;
use chrono::{DateTime, Duration, DurationRound, Utc};
use tracing::{error, info};

use crate::assign::AssignmentEngine;
use crate::forecast::ForecastRunner;
use crate::history::HistoryRecorder;
use crate::pool::PoolManager;

pub struct Orchestrator {
    pool: PoolManager,
    forecaster: ForecastRunner,
    recorder: HistoryRecorder,
    engine: AssignmentEngine,
}

impl Orchestrator {
    pub fn new(
        pool: PoolManager,
        forecaster: ForecastRunner,
        recorder: HistoryRecorder,
        engine: AssignmentEngine,
    ) -> Self {
        Self {
            pool,
            forecaster,
            recorder,
            engine,
        }
    }

    /// Runs the four phases once, targeting the top of the next hour.
    ///
    /// Each phase commits independently: a failing phase is logged and the
    /// later phases still run against whatever state the earlier ones left.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<()> {
        let target_hour = next_hour(now)?;
        info!(now = %now, target_hour = %target_hour, "Starting dispatch cycle");

        if let Err(e) = self.pool.reclaim(now).await {
            error!(error = %e, "Reclaim phase failed");
        }

        let predictions = match self.forecaster.forecast_all(target_hour).await {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Forecast phase failed");
                Vec::new()
            }
        };

        if let Err(e) = self.recorder.record(&predictions).await {
            error!(error = %e, "History phase failed");
        }

        if let Err(e) = self.engine.schedule(target_hour).await {
            error!(error = %e, "Scheduling phase failed");
        }

        info!("Dispatch cycle complete");
        Ok(())
    }

    /// Runs cycles forever, sleeping to each wall-clock hour boundary.
    pub async fn run_forever(&self) -> Result<()> {
        loop {
            let now = Utc::now();
            self.run_cycle(now).await?;

            let next_run = next_hour(now)?;
            let wait_secs = (next_run - Utc::now()).num_seconds().max(1) as u64;
            info!(wait_secs, next_run = %next_run, "Waiting for the next cycle");
            tokio::time::sleep(std::time::Duration::from_secs(wait_secs)).await;
        }
    }
}

/// The top of the hour after `now`.
fn next_hour(now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    Ok(now.duration_trunc(Duration::hours(1))? + Duration::hours(1))
}
