//! Lab lending overdue sweeper
//!
//! Periodically moves checked-out loans past their end time to overdue.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lab_lending::{config::AppConfig, repository::Repository, LendingState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("lab_lending={},sqlx=warn", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting lab lending sweeper v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations completed");

    let sweep = config.sweep.clone();
    let state = LendingState::new(config, Repository::new(pool));

    if !sweep.enabled {
        tracing::warn!("Overdue sweep disabled by configuration, exiting");
        return Ok(());
    }

    if sweep.run_once {
        let report = state.services.loans.sweep_overdue(Utc::now()).await?;
        tracing::info!(examined = report.examined, marked = report.marked, failed = report.failed, "Single sweep done");
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(sweep.interval_seconds.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!(interval_seconds = sweep.interval_seconds, "Overdue sweep scheduled");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = state.services.loans.sweep_overdue(Utc::now()).await {
                    tracing::error!(error = %e, "Overdue sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}
