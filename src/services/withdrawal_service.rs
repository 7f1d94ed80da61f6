use crate::auth::{self, Action, Actor};
use crate::error::{AppError, AppResult};
use crate::models::Bid;
use crate::repositories::{AuctionRepository, BidRepository};
use crate::services::AuditTrailService;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Service for withdrawing bids
pub struct WithdrawalService {
    auction_repo: Arc<AuctionRepository>,
    bid_repo: Arc<BidRepository>,
    audit: Arc<AuditTrailService>,
    pool: PgPool,
}

impl WithdrawalService {
    pub fn new(
        auction_repo: Arc<AuctionRepository>,
        bid_repo: Arc<BidRepository>,
        audit: Arc<AuditTrailService>,
        pool: PgPool,
    ) -> Self {
        Self {
            auction_repo,
            bid_repo,
            audit,
            pool,
        }
    }

    /// Withdraw a bid. Only the placer may withdraw, and never the current
    /// highest active bid; the auction must still be active and not yet
    /// ended.
    ///
    /// The transaction locks only the bid row: withdrawal never touches
    /// `last_price` or `bid_count`, so the auction lock is not needed. The
    /// highest-bid check is re-read inside the transaction before commit.
    pub async fn withdraw(
        &self,
        auction_id: Uuid,
        bid_id: Uuid,
        actor: &Actor,
    ) -> AppResult<Bid> {
        info!(
            "Withdrawing bid: auction={}, bid={}, user={}",
            auction_id, bid_id, actor.user_id
        );

        let mut tx = self.pool.begin().await.map_err(AppError::Sqlx)?;

        let bid = self
            .bid_repo
            .find_for_update(&mut tx, bid_id)
            .await?
            .filter(|b| b.auction_id == auction_id)
            .ok_or_else(|| AppError::NotFound(format!("Bid {} not found", bid_id)))?;

        let auction = self
            .auction_repo
            .find_by_id(auction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Auction {} not found", auction_id)))?;

        auth::authorize(actor, Action::WithdrawBid, &auction, Some(&bid))?;

        let highest = self.bid_repo.find_highest_active(&mut tx, auction_id).await?;
        let is_highest = highest.map(|h| h.id == bid.id).unwrap_or(false);

        let now = chrono::Utc::now();
        bid.check_withdrawable(&auction, is_highest, now)?;

        let withdrawn = self.bid_repo.mark_withdrawn(&mut tx, bid.id, now).await?;

        tx.commit().await.map_err(AppError::Sqlx)?;

        info!("Bid {} withdrawn from auction {}", bid_id, auction_id);

        if let Err(e) = self.audit.log_bid_withdrawn(&withdrawn).await {
            warn!("Audit log failed for bid {}: {}", bid_id, e);
        }

        Ok(withdrawn)
    }
}
