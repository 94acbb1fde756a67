//! SDC Backend Server
//!
//! REST and WebSocket API for the surrogacy and donor coordination
//! platform: accounts, KYC, marketplace, agencies, wallets with escrow,
//! messaging, disputes and contracts.

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use sdc_server::app_state::AppState;
use sdc_server::config::Config;
use sdc_server::{jobs, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sdc_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Initialize database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Database connected successfully");

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .context("failed to run migrations")?;
        tracing::info!("Migrations applied");
    }

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create upload dir {}", config.upload_dir.display()))?;

    let addr = config.socket_addr();
    let sweep_cron = config.subscription_sweep_cron.clone();
    let app_state = AppState::new(config, db_pool);

    // Start background jobs
    let mut scheduler = jobs::start_scheduler(
        &sweep_cron,
        app_state.agency_service.clone(),
        app_state.notification_service.clone(),
    )
    .await?;

    let app = routes::app(app_state);

    tracing::info!("Server starting on {}", addr);
    tracing::info!("WebSocket available at ws://{}/ws", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!("scheduler shutdown failed: {:?}", e);
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
