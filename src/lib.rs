//! CarSouq Auction Backend Library
//!
//! This module exposes the backend components for use by tests and other
//! consumers.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod http_service;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use database::Database;
use repositories::{AuctionRepository, BidRepository};
use services::{AuditTrailService, BiddingService, ClosingService, WithdrawalService};
use std::sync::Arc;

/// Application state containing all repositories and services
pub struct AppState {
    pub database: Database,
    pub auction_repo: Arc<AuctionRepository>,
    pub bid_repo: Arc<BidRepository>,
    pub audit: Arc<AuditTrailService>,
    pub bidding_service: Arc<BiddingService>,
    pub closing_service: Arc<ClosingService>,
    pub withdrawal_service: Arc<WithdrawalService>,
}

impl AppState {
    /// Create a new AppState with initialized repositories and services
    pub fn new(pool: sqlx::PgPool, audit: AuditTrailService) -> Self {
        let database = Database::new(pool.clone());
        let auction_repo = Arc::new(AuctionRepository::new(pool.clone()));
        let bid_repo = Arc::new(BidRepository::new(pool.clone()));
        let audit = Arc::new(audit);

        let bidding_service = Arc::new(BiddingService::new(
            auction_repo.clone(),
            bid_repo.clone(),
            audit.clone(),
            pool.clone(),
        ));
        let closing_service = Arc::new(ClosingService::new(
            auction_repo.clone(),
            bid_repo.clone(),
            audit.clone(),
            pool.clone(),
        ));
        let withdrawal_service = Arc::new(WithdrawalService::new(
            auction_repo.clone(),
            bid_repo.clone(),
            audit.clone(),
            pool,
        ));

        Self {
            database,
            auction_repo,
            bid_repo,
            audit,
            bidding_service,
            closing_service,
            withdrawal_service,
        }
    }
}
