//! Homecare Route Worker - daily route assembly and travel-time estimation
//!
//! This worker connects to NATS and answers daily route requests for
//! home-care workers, or computes a single route from the command line.

mod cli;
mod config;
mod db;
mod defaults;
mod error;
mod handlers;
mod services;
mod types;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::services::assignment_filter::HolidayContextPolicy;
use crate::services::engine::RouteEngine;
use crate::services::segment_estimator::SegmentEstimator;
use crate::services::sources::{
    AssignmentSource, FixtureData, HolidayCalendar, StaticAssignmentSource, StaticHolidayCalendar,
};
use crate::services::travel::create_travel_provider;
use crate::types::DailyRouteRequest;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs directory - use LOGS_DIR env var or default to ../logs (relative to worker)
    let logs_dir = std::env::var("LOGS_DIR")
        .unwrap_or_else(|_| "../logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &logs_dir,
        "worker.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // `compute` prints JSON on stdout, so its logs go to stderr
    let stdout_layer = match cli.command {
        Some(Command::Compute { .. }) => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed(),
        _ => tracing_subscriber::fmt::layer().boxed(),
    };

    // Initialize logging - both console and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,homecare_route_worker=debug".into()),
        ))
        .with(stdout_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))  // file
        .init();

    info!("Starting Homecare Route Worker...");

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");

    let engine = Arc::new(build_engine(&config).await?);

    match cli.command {
        Some(Command::Compute { worker_id, date, mode, origin }) => {
            let route = match origin {
                None => engine.compute(&worker_id, &date, mode).await?,
                Some(origin) => {
                    engine
                        .compute_daily_route(&DailyRouteRequest {
                            worker_id,
                            date,
                            mode,
                            origin_address: Some(origin),
                            session_key: None,
                            refresh: false,
                        })
                        .await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&route)?);
            Ok(())
        }
        Some(Command::Serve) | None => serve(&config, engine).await,
    }
}

/// Wire data sources, travel provider and caches into the engine
async fn build_engine(config: &Config) -> Result<RouteEngine> {
    let (assignments, calendar): (Arc<dyn AssignmentSource>, Arc<dyn HolidayCalendar>) =
        match (&config.database_url, &config.fixtures_path) {
            (Some(database_url), _) => {
                let pool = db::create_pool(database_url).await?;
                info!("Connected to PostgreSQL");
                (
                    Arc::new(db::PgAssignmentSource::new(pool.clone())),
                    Arc::new(db::PgHolidayCalendar::new(pool)),
                )
            }
            (None, Some(path)) => {
                let data = FixtureData::load(path)?;
                info!(
                    "Loaded {} assignment(s) and {} holiday(s) from {}",
                    data.assignments.len(),
                    data.holidays.len(),
                    path
                );
                (
                    Arc::new(StaticAssignmentSource::new(data.assignments)),
                    Arc::new(StaticHolidayCalendar::new(data.holidays)),
                )
            }
            (None, None) => anyhow::bail!("Either DATABASE_URL or FIXTURES_PATH must be set"),
        };

    let provider = create_travel_provider(config).await?;
    info!("Travel provider initialized: {}", provider.name());

    let estimator = SegmentEstimator::new(
        provider,
        config.max_concurrent_lookups,
        config.lookup_timeout,
        config.cache_ttl,
    );

    Ok(RouteEngine::new(
        assignments,
        calendar,
        estimator,
        HolidayContextPolicy {
            saturday_is_holiday: config.saturday_is_holiday,
        },
        config.cache_ttl,
    ))
}

async fn serve(config: &Config, engine: Arc<RouteEngine>) -> Result<()> {
    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    if !config.cache_ttl.is_zero() {
        let engine = Arc::clone(&engine);
        let period = config.cache_ttl;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                engine.cleanup_caches();
            }
        });
    }

    // Start message handlers
    let handler_result = handlers::start_handlers(nats_client, engine).await;

    if let Err(e) = handler_result {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}
