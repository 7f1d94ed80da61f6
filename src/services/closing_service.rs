use crate::auth::{self, Action, Actor};
use crate::error::{AppError, AppResult};
use crate::models::{Auction, AuctionStatus, Bid};
use crate::repositories::{AuctionRepository, BidRepository};
use crate::services::AuditTrailService;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Service for closing and cancelling auctions
pub struct ClosingService {
    auction_repo: Arc<AuctionRepository>,
    bid_repo: Arc<BidRepository>,
    audit: Arc<AuditTrailService>,
    pool: PgPool,
}

/// Result of closing an auction
#[derive(Debug)]
pub struct CloseResult {
    pub auction: Auction,
    pub winning_bid: Option<Bid>,
    /// Some(met) when a reserve price was set, None otherwise
    pub reserve_met: Option<bool>,
    pub message: String,
}

impl ClosingService {
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

    /// Close an auction on explicit owner/admin request
    pub async fn close(&self, auction_id: Uuid, actor: &Actor) -> AppResult<CloseResult> {
        info!("Closing auction {} by {}", auction_id, actor.user_id);

        let mut tx = self.pool.begin().await.map_err(AppError::Sqlx)?;
        let auction = self
            .auction_repo
            .find_for_update(&mut tx, auction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Auction {} not found", auction_id)))?;

        auth::authorize(actor, Action::CloseAuction, &auction, None)?;

        self.close_locked(tx, auction, Some(actor.user_id)).await
    }

    /// Close an overdue auction on behalf of the sweep. No actor; the
    /// auto_close flag on the row is the authorization.
    pub async fn close_due(&self, auction_id: Uuid) -> AppResult<CloseResult> {
        let mut tx = self.pool.begin().await.map_err(AppError::Sqlx)?;
        let auction = self
            .auction_repo
            .find_for_update(&mut tx, auction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Auction {} not found", auction_id)))?;

        self.close_locked(tx, auction, None).await
    }

    /// Determine the winner and finalize, with the auction row already
    /// locked in `tx`
    async fn close_locked(
        &self,
        mut tx: Transaction<'static, Postgres>,
        auction: Auction,
        closed_by: Option<Uuid>,
    ) -> AppResult<CloseResult> {
        auction.check_transitionable()?;

        // Highest active bid decided inside the same transaction
        let highest = self.bid_repo.find_highest_active(&mut tx, auction.id).await?;
        let outcome = auction.close_outcome(highest.as_ref());

        let updated = self
            .auction_repo
            .mark_terminal(&mut tx, auction.id, AuctionStatus::Closed, outcome.winner_id)
            .await?;

        tx.commit().await.map_err(AppError::Sqlx)?;

        let (winning_bid, message) = match (highest, outcome.reserve_met) {
            (Some(bid), Some(true)) => {
                let msg = format!("Auction closed; sold at {} with reserve met", bid.price);
                (Some(bid), msg)
            }
            (Some(bid), None) => {
                let msg = format!("Auction closed; sold at {}", bid.price);
                (Some(bid), msg)
            }
            (Some(bid), Some(false)) => {
                info!(
                    "Auction {} closed without sale: highest bid {} under reserve",
                    auction.id, bid.price
                );
                // Highest bid exists but the reserve was not met; no sale
                (None, "Auction closed; reserve price not met".to_string())
            }
            (None, _) => (None, "Auction closed with no bids".to_string()),
        };

        info!(
            "Auction {} closed: winner={:?}, reserve_met={:?}",
            auction.id, outcome.winner_id, outcome.reserve_met
        );

        if let Err(e) = self
            .audit
            .log_auction_closed(
                auction.id,
                outcome.winner_id,
                winning_bid.as_ref().map(|b| b.price),
                outcome.reserve_met,
                closed_by,
            )
            .await
        {
            warn!("Audit log failed for auction {}: {}", auction.id, e);
        }

        Ok(CloseResult {
            auction: updated,
            winning_bid,
            reserve_met: outcome.reserve_met,
            message,
        })
    }

    /// Cancel an auction before close. Owners may cancel only while the
    /// auction has no bids; admins may cancel regardless.
    pub async fn cancel(&self, auction_id: Uuid, actor: &Actor) -> AppResult<Auction> {
        info!("Cancelling auction {} by {}", auction_id, actor.user_id);

        let mut tx = self.pool.begin().await.map_err(AppError::Sqlx)?;
        let auction = self
            .auction_repo
            .find_for_update(&mut tx, auction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Auction {} not found", auction_id)))?;

        auth::authorize(actor, Action::CancelAuction, &auction, None)?;
        auction.check_transitionable()?;

        let updated = self
            .auction_repo
            .mark_terminal(&mut tx, auction.id, AuctionStatus::Cancelled, None)
            .await?;

        tx.commit().await.map_err(AppError::Sqlx)?;

        if let Err(e) = self.audit.log_auction_cancelled(auction.id, actor.user_id).await {
            warn!("Audit log failed for auction {}: {}", auction.id, e);
        }

        Ok(updated)
    }
}
