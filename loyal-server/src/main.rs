//! Loyalty Points Server
//!
//! Accepts order numbers from registered users, polls the accrual system
//! for their status and credits the points to each user's balance.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::{CliOverrides, ConfigLoader};
use loyal_core::accrual::AccrualClient;
use loyal_core::ledger::PgLedger;
use loyal_core::processors::spawn_pipeline;
use server::{build_router, run_server};
use shutdown::shutdown_signal;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Loyalty points accrual service
#[derive(Parser, Debug)]
#[command(name = "loyal-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (e.g., 0.0.0.0:8080)
    #[arg(short = 'a', long, env = "RUN_ADDRESS")]
    listen: Option<String>,

    /// PostgreSQL connection URI
    #[arg(short, long, env = "DATABASE_URI")]
    database_uri: Option<String>,

    /// Base URL of the accrual system
    #[arg(short = 'r', long, env = "ACCRUAL_SYSTEM_ADDRESS")]
    accrual_address: Option<Url>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();

    tracing::info!("Starting loyal-server v{}", env!("CARGO_PKG_VERSION"));

    let loader = ConfigLoader::new(
        args.config.as_ref(),
        CliOverrides {
            listen: args.listen,
            database_uri: args.database_uri,
            accrual_address: args.accrual_address,
        },
    );
    let config = loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_uri)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let ledger = Arc::new(PgLedger::new(db_pool.clone()));
    let accrual = Arc::new(AccrualClient::new(&config.accrual)?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut pipeline = spawn_pipeline(
        ledger.clone(),
        accrual,
        ledger.clone(),
        &config.pipeline,
        shutdown_rx.clone(),
    );

    let state = AppState::new(ledger.clone(), ledger, config.auth);
    let router = build_router(state);
    let mut server = tokio::spawn(run_server(router, config.server.listen, shutdown_rx));

    let mut generator_result = None;
    let mut server_result = None;
    tokio::select! {
        _ = shutdown_signal() => {}
        result = &mut pipeline.generator => {
            tracing::error!("TaskGenerator stopped, shutting down");
            generator_result = Some(result);
        }
        result = &mut server => {
            tracing::error!("HTTP server stopped, shutting down");
            server_result = Some(result);
        }
    }

    let _ = shutdown_tx.send(true);

    let generator_result = match generator_result {
        Some(result) => result,
        None => (&mut pipeline.generator).await,
    };
    pipeline.join_stages().await;

    let server_result = match server_result {
        Some(result) => result,
        None => server.await,
    };

    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    generator_result??;
    server_result??;
    Ok(())
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
