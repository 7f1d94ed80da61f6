use crate::auth::{self, Action, Actor};
use crate::error::{AppError, AppResult};
use crate::models::{AntiSnipe, Auction, Bid};
use crate::repositories::{AuctionRepository, BidRepository};
use crate::services::AuditTrailService;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Service for placing bids
pub struct BiddingService {
    auction_repo: Arc<AuctionRepository>,
    bid_repo: Arc<BidRepository>,
    audit: Arc<AuditTrailService>,
    pool: PgPool,
}

/// Outcome of an accepted bid
#[derive(Debug)]
pub struct PlaceBidResult {
    pub bid: Bid,
    pub auction: Auction,
    pub anti_snipe: Option<AntiSnipe>,
}

impl BiddingService {
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

    /// Place a bid on an auction.
    ///
    /// The auction row is loaded `FOR UPDATE` before any validation, so two
    /// concurrent bids on the same auction serialize in lock-acquisition
    /// order; the loser re-validates against the winner's committed last
    /// price and is rejected if it no longer clears the minimum. Bid insert,
    /// price/count update and anti-snipe extension commit atomically; any
    /// failure rolls the whole placement back.
    pub async fn place_bid(
        &self,
        auction_id: Uuid,
        actor: &Actor,
        price: Decimal,
        comment: Option<&str>,
    ) -> AppResult<PlaceBidResult> {
        info!(
            "Placing bid: auction={}, bidder={}, price={}",
            auction_id, actor.user_id, price
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!(
                "Failed to open bid transaction: auction={}, bidder={}, price={}: {}",
                auction_id, actor.user_id, price, e
            );
            AppError::Sqlx(e)
        })?;

        // Exclusive row lock; status and timing are re-checked under it
        let auction = self
            .auction_repo
            .find_for_update(&mut tx, auction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Auction {} not found", auction_id)))?;

        auth::authorize(actor, Action::PlaceBid, &auction, None)?;

        let now = chrono::Utc::now();
        let placement = auction.apply_bid(price, now)?;

        let bid = self
            .bid_repo
            .create(&mut tx, auction.id, actor.user_id, price, comment)
            .await?;

        let updated = self
            .auction_repo
            .apply_placement(&mut tx, auction.id, &placement)
            .await?;

        tx.commit().await.map_err(|e| {
            error!(
                "Failed to commit bid: auction={}, bidder={}, price={}: {}",
                auction_id, actor.user_id, price, e
            );
            AppError::Sqlx(e)
        })?;

        if let Some(snipe) = &placement.anti_snipe {
            info!(
                "Anti-snipe extended auction {}: new end time {}",
                auction_id, snipe.new_end_time
            );
        }

        if let Err(e) = self
            .audit
            .log_bid_placed(&bid, placement.anti_snipe.as_ref())
            .await
        {
            warn!("Audit log failed for bid {}: {}", bid.id, e);
        }

        Ok(PlaceBidResult {
            bid,
            auction: updated,
            anti_snipe: placement.anti_snipe,
        })
    }

    /// Create an auction for an auction-type ad (status active, no bids)
    #[allow(clippy::too_many_arguments)]
    pub async fn create_auction(
        &self,
        actor: &Actor,
        ad_id: Uuid,
        owner_id: Uuid,
        start_price: Decimal,
        reserve_price: Option<Decimal>,
        minimum_bid_increment: Decimal,
        start_time: chrono::DateTime<chrono::Utc>,
        end_time: chrono::DateTime<chrono::Utc>,
        anti_snip_window_seconds: i32,
        anti_snip_extension_seconds: i32,
        auto_close: bool,
        is_last_price_visible: bool,
    ) -> AppResult<Auction> {
        if !actor.is_admin() {
            return Err(AppError::Forbidden(
                "Only administrators can create auctions".to_string(),
            ));
        }

        Auction::validate_terms(
            start_price,
            reserve_price,
            minimum_bid_increment,
            start_time,
            end_time,
        )
        .map_err(AppError::Validation)?;

        if anti_snip_window_seconds < 0 || anti_snip_extension_seconds < 0 {
            return Err(AppError::Validation(
                "Anti-snipe window and extension must not be negative".to_string(),
            ));
        }

        if let Some(existing) = self.auction_repo.find_by_ad(ad_id).await? {
            return Err(AppError::Conflict(format!(
                "Ad {} already has auction {}",
                ad_id, existing.id
            )));
        }

        let auction = self
            .auction_repo
            .create(
                ad_id,
                owner_id,
                start_price,
                reserve_price,
                minimum_bid_increment,
                start_time,
                end_time,
                anti_snip_window_seconds,
                anti_snip_extension_seconds,
                auto_close,
                is_last_price_visible,
            )
            .await?;

        info!("Auction {} created for ad {}", auction.id, ad_id);

        if let Err(e) = self.audit.log_auction_created(&auction, actor.user_id).await {
            warn!("Audit log failed for auction {}: {}", auction.id, e);
        }

        Ok(auction)
    }

    /// Fetch an auction or fail with not-found
    pub async fn get_auction(&self, auction_id: Uuid) -> AppResult<Auction> {
        self.auction_repo
            .find_by_id(auction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Auction {} not found", auction_id)))
    }

    /// List active bids for an auction, owner/staff only
    pub async fn list_bids(&self, auction_id: Uuid, actor: &Actor) -> AppResult<Vec<Bid>> {
        let auction = self.get_auction(auction_id).await?;
        auth::authorize(actor, Action::ViewBids, &auction, None)?;
        Ok(self.bid_repo.find_active_by_auction(auction_id).await?)
    }

    /// Fetch a single bid, restricted to the bid owner, the auction owner
    /// and staff
    pub async fn get_bid(&self, auction_id: Uuid, bid_id: Uuid, actor: &Actor) -> AppResult<Bid> {
        let auction = self.get_auction(auction_id).await?;
        let bid = self
            .bid_repo
            .find_by_id(bid_id)
            .await?
            .filter(|b| b.auction_id == auction_id)
            .ok_or_else(|| AppError::NotFound(format!("Bid {} not found", bid_id)))?;
        auth::authorize(actor, Action::ViewBid, &auction, Some(&bid))?;
        Ok(bid)
    }
}
