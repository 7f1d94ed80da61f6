//! CarSouq Auction Backend Service
//!
//! Main entry point for the auction and bidding backend.
//! This service provides:
//! - HTTP API for auction and bid operations
//! - Background sweep that closes overdue auto-close auctions

use carsouq_backend::config::AppConfig;
use carsouq_backend::database::{create_pool, run_migrations};
use carsouq_backend::error::{AppError, AppResult};
use carsouq_backend::http_service;
use carsouq_backend::services::{AuditTrailService, AutoCloseSweeper};
use carsouq_backend::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("carsouq_backend={},sqlx=warn,tower_http=info", config.log_level).into()
            }),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║         CarSouq Auction Backend Starting                  ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);
    info!("Sweep interval: {}s", config.sweep_interval_secs);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    // Run migrations
    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    // Initialize audit trail service
    let audit_log_dir = std::path::PathBuf::from(
        std::env::var("AUDIT_LOG_DIR").unwrap_or_else(|_| "./logs".to_string()),
    );

    // Create logs directory if it doesn't exist
    if let Err(e) = std::fs::create_dir_all(&audit_log_dir) {
        warn!("Could not create audit log directory: {}", e);
    }

    let audit = AuditTrailService::new(audit_log_dir).map_err(|e| {
        error!("Failed to initialize audit trail: {}", e);
        AppError::Message(format!("Audit trail initialization failed: {}", e))
    })?;

    // Initialize application state with repositories and services
    let app_state = Arc::new(AppState::new(pool.clone(), audit));
    info!("✓ Application state initialized with repositories and services");

    // =========================================================================
    // BACKGROUND TASKS
    // =========================================================================
    info!("Starting background tasks...");

    // Sweep that closes overdue auto-close auctions, one per transaction
    let sweeper = AutoCloseSweeper::new(
        app_state.auction_repo.clone(),
        app_state.closing_service.clone(),
        config.sweep_interval(),
    );

    let sweeper_handle = tokio::spawn(async move {
        sweeper.start().await;
    });
    info!(
        "✓ Auto-close sweeper started ({}s interval)",
        config.sweep_interval_secs
    );

    // =========================================================================
    // START SERVER
    // =========================================================================

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port)
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid HTTP address: {}", e)))?;

    info!("Starting HTTP server on {}...", http_addr);

    let listener = TcpListener::bind(http_addr)
        .await
        .map_err(|e| AppError::Message(format!("Failed to bind HTTP server: {}", e)))?;

    let app = http_service::routes(app_state.clone());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            error!("HTTP server error: {}", e);
        }
    });

    info!("✓ HTTP server started on {}", http_addr);

    // =========================================================================
    // READY
    // =========================================================================
    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║         CarSouq Auction Backend Ready!                    ║");
    info!("╠══════════════════════════════════════════════════════════╣");
    info!("║  HTTP API:     0.0.0.0:{}                              ║", config.http_port);
    info!("║  Environment:  {}                                    ║", config.environment);
    info!("╚══════════════════════════════════════════════════════════╝");
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down gracefully...");
        }
        _ = server_handle => {
            error!("HTTP server exited unexpectedly");
        }
        _ = sweeper_handle => {
            error!("Sweeper task exited unexpectedly");
        }
    }

    info!("CarSouq auction backend shutdown complete");
    Ok(())
}
