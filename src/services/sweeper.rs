use crate::error::AppError;
use crate::repositories::AuctionRepository;
use crate::services::ClosingService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info};

/// Auctions closed per sweep pass
const SWEEP_BATCH_SIZE: i64 = 100;

/// Background task that closes overdue auto-close auctions.
///
/// Each auction is closed in its own transaction so one stuck or failing
/// auction never blocks the rest of the batch, and no lock is held across
/// auctions.
pub struct AutoCloseSweeper {
    auction_repo: Arc<AuctionRepository>,
    closing_service: Arc<ClosingService>,
    sweep_interval: Duration,
}

impl AutoCloseSweeper {
    /// Create a new sweeper
    pub fn new(
        auction_repo: Arc<AuctionRepository>,
        closing_service: Arc<ClosingService>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            auction_repo,
            closing_service,
            sweep_interval,
        }
    }

    /// Start sweeping
    pub async fn start(self) {
        let mut interval = time::interval(self.sweep_interval);
        info!("Auto-close sweeper started, sweeping every {:?}", self.sweep_interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.sweep_once().await {
                error!("Error in auto-close sweep: {}", e);
            }
        }
    }

    /// Close every overdue auction found in this pass
    async fn sweep_once(&self) -> Result<(), AppError> {
        let due = self.auction_repo.find_due_for_close(SWEEP_BATCH_SIZE).await?;

        if due.is_empty() {
            return Ok(());
        }

        debug!("Sweep found {} auction(s) due for close", due.len());

        for auction_id in due {
            match self.closing_service.close_due(auction_id).await {
                Ok(result) => {
                    info!(
                        "Sweep closed auction {}: winner={:?}",
                        auction_id, result.auction.winner_id
                    );
                }
                // Lost the race to an explicit close between the scan and
                // the lock; nothing to do for this auction
                Err(AppError::Conflict(_)) => {
                    debug!("Auction {} already finalized, skipping", auction_id);
                }
                Err(e) => {
                    error!("Sweep failed to close auction {}: {}", auction_id, e);
                }
            }
        }

        Ok(())
    }
}
