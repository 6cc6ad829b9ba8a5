//! CLI entry point for the hourly dispatch service.
//!
//! Provides subcommands for running the continuous hourly loop and for
//! executing a single dispatch cycle by hand.

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use transit_dispatch::assign::AssignmentEngine;
use transit_dispatch::config::DispatchConfig;
use transit_dispatch::context::OpenMeteoContext;
use transit_dispatch::cycle::Orchestrator;
use transit_dispatch::forecast::ForecastRunner;
use transit_dispatch::history::HistoryRecorder;
use transit_dispatch::pool::PoolManager;
use transit_dispatch::predictor::HttpPredictor;
use transit_dispatch::store::{PgStore, Store};

#[derive(Parser)]
#[command(name = "transit_dispatch")]
#[command(about = "Hourly demand-driven bus dispatch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dispatch loop, one cycle per wall-clock hour
    Run,
    /// Run a single dispatch cycle and exit
    Cycle {
        /// Treat this RFC 3339 timestamp as "now" instead of the clock
        #[arg(long)]
        at: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_dispatch.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_dispatch.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = DispatchConfig::from_env()?;
    let orchestrator = build_orchestrator(&config).await?;

    match cli.command {
        Commands::Run => {
            orchestrator.run_forever().await?;
        }
        Commands::Cycle { at } => {
            let now: DateTime<Utc> = match at {
                Some(raw) => raw.parse()?,
                None => Utc::now(),
            };
            orchestrator.run_cycle(now).await?;
        }
    }

    Ok(())
}

/// Wires the four phase components onto a shared Postgres store. Fatal if
/// the database stays unreachable through the configured retries.
async fn build_orchestrator(config: &DispatchConfig) -> Result<Orchestrator> {
    let store: Arc<dyn Store> = Arc::new(
        PgStore::connect(
            &config.database_url,
            config.db_connect_retries,
            config.db_retry_delay,
        )
        .await?,
    );
    let predictor = Arc::new(HttpPredictor::new(
        config.predictor_url.clone(),
        config.sequence_length,
    ));
    let context = Arc::new(OpenMeteoContext::new(
        config.weather_lat,
        config.weather_lon,
    ));

    Ok(Orchestrator::new(
        PoolManager::new(store.clone(), config.trip_duration_minutes),
        ForecastRunner::new(store.clone(), predictor, config.sequence_length),
        HistoryRecorder::new(store.clone(), context),
        AssignmentEngine::new(store, config.effective_capacity),
    ))
}
